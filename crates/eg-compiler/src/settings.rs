//! Persisted configuration
//!
//! The popup and options pages write two storage areas. This module reads
//! them back and resolves the engine state for one domain.

use serde::{Deserialize, Serialize};

use eg_core::state::{DEFAULT_GLYPH, DEFAULT_MUTATION_DELAY_MS, MAX_MUTATION_DELAY_MS};
use eg_core::types::{HideMode, Rule, SearchMode, Site, ALL_SITES};
use eg_core::EngineState;

use crate::selector::compile_for_domain;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid storage data: {0}")]
    Json(#[from] serde_json::Error),
}

/// One storage area (`sync` or `local`). Every key is optional; keys owned by
/// other parts of the extension are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageArea {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites: Option<Vec<Site>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emo_guardian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_import_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_initialized: Option<bool>,
}

impl StorageArea {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Contents written on first run.
    pub fn fresh_install() -> Self {
        let mut all_sites = Site::new(ALL_SITES);
        all_sites.rules = recommended_rules();
        Self {
            emo_guardian: Some(DEFAULT_GLYPH.to_string()),
            sites: Some(vec![all_sites]),
            has_initialized: Some(true),
            ..Self::default()
        }
    }
}

/// Configuration the content script starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub keywords: Vec<String>,
    pub sites: Vec<Site>,
    pub glyph: String,
    pub mutation_delay_ms: u32,
}

impl Settings {
    /// Pick each value from the area that owns it. With auto-import on, the
    /// imported copy in `local` replaces `sync`. The blocking speed is a
    /// per-device setting and always lives in `local`.
    pub fn resolve(sync: &StorageArea, local: &StorageArea) -> Self {
        let source = if local.auto_import_enabled.unwrap_or(false) {
            local
        } else {
            sync
        };

        Self {
            keywords: source.keywords.clone().unwrap_or_default(),
            sites: source.sites.clone().unwrap_or_default(),
            glyph: source
                .emo_guardian
                .clone()
                .unwrap_or_else(|| DEFAULT_GLYPH.to_string()),
            mutation_delay_ms: local
                .blocking_speed
                .unwrap_or(DEFAULT_MUTATION_DELAY_MS)
                .min(MAX_MUTATION_DELAY_MS),
        }
    }

    /// Whether the user left the engine on for `domain`. Unknown domains are on.
    pub fn is_enabled_for(&self, domain: &str) -> bool {
        self.sites
            .iter()
            .find(|site| site.domain == domain)
            .map_or(true, |site| site.enabled)
    }

    /// Initial engine state for a frame whose rules come from `domain`.
    pub fn engine_state(&self, domain: &str) -> EngineState {
        EngineState {
            enabled: self.is_enabled_for(domain),
            keywords: self.keywords.clone(),
            selectors: compile_for_domain(&self.sites, domain),
            placeholder_glyph: self.glyph.clone(),
            mutation_delay_ms: self.mutation_delay_ms,
        }
    }
}

/// Rules installed for all sites on first run.
pub fn recommended_rules() -> Vec<Rule> {
    const TEXT: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "pre", "a"];
    const ELEMENT: [&str; 5] = ["blockquote", "span", "li", "td", "img"];

    TEXT.iter()
        .map(|tag| Rule::new(*tag, HideMode::Text, SearchMode::Shallow))
        .chain(
            ELEMENT
                .iter()
                .map(|tag| Rule::new(*tag, HideMode::Element, SearchMode::Shallow)),
        )
        .collect()
}
