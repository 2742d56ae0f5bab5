//! Live engine configuration mirrored into each frame.

use serde::{Deserialize, Serialize};

use crate::types::SelectorBundle;

/// Glyph written into placeholders on a fresh install.
pub const DEFAULT_GLYPH: &str = "😎👍";
/// Debounce delay used when none is stored.
pub const DEFAULT_MUTATION_DELAY_MS: u32 = 50;
/// Upper bound of the user-tunable blocking speed.
pub const MAX_MUTATION_DELAY_MS: u32 = 100;

/// The content script's mutable view of its configuration.
///
/// Built once from persisted settings, then mutated in place by inbound
/// commands. Never written back to storage from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub enabled: bool,
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub selectors: SelectorBundle,
    pub placeholder_glyph: String,
    pub mutation_delay_ms: u32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: Vec::new(),
            selectors: SelectorBundle::default(),
            placeholder_glyph: DEFAULT_GLYPH.to_string(),
            mutation_delay_ms: DEFAULT_MUTATION_DELAY_MS,
        }
    }
}

impl EngineState {
    /// True when guard passes may change the page.
    pub fn is_armed(&self) -> bool {
        self.enabled && has_keywords(&self.keywords)
    }

    /// Merge a partial update. Absent fields keep their value.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(keywords) = patch.keywords {
            self.keywords = keywords;
        }
        if let Some(selector) = patch.element_shallow {
            self.selectors.element_shallow = selector;
        }
        if let Some(selector) = patch.element_deep {
            self.selectors.element_deep = selector;
        }
        if let Some(selector) = patch.text {
            self.selectors.text = selector;
        }
        if let Some(glyph) = patch.placeholder_glyph {
            self.placeholder_glyph = glyph;
        }
        if let Some(delay) = patch.mutation_delay_ms {
            self.mutation_delay_ms = delay.min(MAX_MUTATION_DELAY_MS);
        }
    }
}

/// True when at least one non-empty keyword is present.
pub fn has_keywords(keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| !keyword.is_empty())
}

/// Partial update carried by a `setState` command.
///
/// Unknown keys are rejected during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, alias = "elementShallowSelector", skip_serializing_if = "Option::is_none")]
    pub element_shallow: Option<String>,
    #[serde(default, alias = "elementDeepSelector", skip_serializing_if = "Option::is_none")]
    pub element_deep: Option<String>,
    #[serde(default, alias = "textSelector", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "emoGuardian", skip_serializing_if = "Option::is_none")]
    pub placeholder_glyph: Option<String>,
    #[serde(default, alias = "blockingSpeed", skip_serializing_if = "Option::is_none")]
    pub mutation_delay_ms: Option<u32>,
}

impl From<SelectorBundle> for StatePatch {
    fn from(bundle: SelectorBundle) -> Self {
        Self {
            element_shallow: Some(bundle.element_shallow),
            element_deep: Some(bundle.element_deep),
            text: Some(bundle.text),
            ..Self::default()
        }
    }
}
