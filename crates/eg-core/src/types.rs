//! Core type definitions for EmoGuard
//!
//! These types mirror the rule records persisted by the popup and options
//! pages and the selector bundle the guard engine consumes.

use serde::{Deserialize, Serialize};

/// Domain key of the RuleSet that applies to every site.
pub const ALL_SITES: &str = "all sites";

/// Error for a stored mode value outside its known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode value: {0}")]
pub struct InvalidMode(pub u8);

// =============================================================================
// Hide Mode
// =============================================================================

/// Replacement strategy for a toxic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum HideMode {
    /// Discard the element's content and show only the placeholder glyph
    #[default]
    Element = 0,
    /// Keep the element's markup but redact matched keywords
    Text = 1,
}

impl TryFrom<u8> for HideMode {
    type Error = InvalidMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Element),
            1 => Ok(Self::Text),
            _ => Err(InvalidMode(value)),
        }
    }
}

impl From<HideMode> for u8 {
    fn from(mode: HideMode) -> Self {
        mode as u8
    }
}

// =============================================================================
// Search Mode
// =============================================================================

/// Which part of an element is searched for keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum SearchMode {
    /// Own text nodes and attribute values only
    #[default]
    Shallow = 0,
    /// Full descendant text and attribute values
    Deep = 1,
}

impl TryFrom<u8> for SearchMode {
    type Error = InvalidMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Shallow),
            1 => Ok(Self::Deep),
            _ => Err(InvalidMode(value)),
        }
    }
}

impl From<SearchMode> for u8 {
    fn from(mode: SearchMode) -> Self {
        mode as u8
    }
}

// =============================================================================
// Rules
// =============================================================================

/// A user-authored hiding rule.
///
/// Field names on the wire follow the stored schema: `value` is the CSS
/// selector and `visibility: true` marks a rule the user has switched off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(rename = "value")]
    pub pattern: String,
    #[serde(default)]
    pub hide_mode: HideMode,
    #[serde(default)]
    pub search_mode: SearchMode,
    #[serde(rename = "visibility", default)]
    pub suppressed: bool,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, hide_mode: HideMode, search_mode: SearchMode) -> Self {
        Self {
            pattern: pattern.into(),
            hide_mode,
            search_mode,
            suppressed: false,
        }
    }

    /// Rule registered by the interactive picker.
    pub fn picked(pattern: impl Into<String>) -> Self {
        Self::new(pattern, HideMode::Element, SearchMode::Shallow)
    }

    /// Search mode actually applied. Text-hide always searches shallow.
    pub fn effective_search_mode(&self) -> SearchMode {
        match self.hide_mode {
            HideMode::Text => SearchMode::Shallow,
            HideMode::Element => self.search_mode,
        }
    }
}

/// RuleSet scoped to one domain, or to every domain when `domain` is
/// [`ALL_SITES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub domain: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(rename = "cssSelectors", default)]
    pub rules: Vec<Rule>,
}

fn enabled_by_default() -> bool {
    true
}

impl Site {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            enabled: true,
            rules: Vec::new(),
        }
    }

    pub fn is_all_sites(&self) -> bool {
        self.domain == ALL_SITES
    }
}

// =============================================================================
// Selector Bundle
// =============================================================================

/// The three comma-joined selector lists the engine sweeps with.
///
/// An empty string matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorBundle {
    #[serde(alias = "elementShallowSelector", default)]
    pub element_shallow: String,
    #[serde(alias = "elementDeepSelector", default)]
    pub element_deep: String,
    #[serde(alias = "textSelector", default)]
    pub text: String,
}

impl SelectorBundle {
    pub fn is_empty(&self) -> bool {
        self.element_shallow.is_empty() && self.element_deep.is_empty() && self.text.is_empty()
    }

    /// The `(search, hide)` passes in sweep order.
    pub fn passes(&self) -> [(&str, SearchMode, HideMode); 3] {
        [
            (self.element_shallow.as_str(), SearchMode::Shallow, HideMode::Element),
            (self.element_deep.as_str(), SearchMode::Deep, HideMode::Element),
            (self.text.as_str(), SearchMode::Shallow, HideMode::Text),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_reads_stored_schema() {
        let rule: Rule =
            serde_json::from_str(r#"{"value":"li","hideMode":0,"searchMode":1,"visibility":true}"#)
                .expect("rule should parse");
        assert_eq!(rule.pattern, "li");
        assert_eq!(rule.hide_mode, HideMode::Element);
        assert_eq!(rule.search_mode, SearchMode::Deep);
        assert!(rule.suppressed);
    }

    #[test]
    fn rule_defaults_missing_search_mode() {
        let rule: Rule = serde_json::from_str(r#"{"value":"h1","hideMode":1,"visibility":false}"#)
            .expect("rule should parse");
        assert_eq!(rule.search_mode, SearchMode::Shallow);
        assert_eq!(rule.hide_mode, HideMode::Text);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(serde_json::from_str::<Rule>(r#"{"value":"p","hideMode":7}"#).is_err());
        assert_eq!(HideMode::try_from(2), Err(InvalidMode(2)));
    }

    #[test]
    fn text_rules_search_shallow() {
        let rule = Rule::new("p", HideMode::Text, SearchMode::Deep);
        assert_eq!(rule.effective_search_mode(), SearchMode::Shallow);
        let rule = Rule::new("p", HideMode::Element, SearchMode::Deep);
        assert_eq!(rule.effective_search_mode(), SearchMode::Deep);
    }

    #[test]
    fn site_round_trips_field_names() {
        let mut site = Site::new("example.com");
        site.rules.push(Rule::picked("div.ad"));
        let json = serde_json::to_value(&site).expect("site should serialize");
        assert_eq!(json["cssSelectors"][0]["value"], "div.ad");
        assert_eq!(json["cssSelectors"][0]["visibility"], false);
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn bundle_accepts_legacy_keys() {
        let bundle: SelectorBundle = serde_json::from_str(
            r#"{"elementShallowSelector":"p","elementDeepSelector":"li","textSelector":"h1"}"#,
        )
        .expect("bundle should parse");
        assert_eq!(bundle.element_shallow, "p");
        assert_eq!(bundle.element_deep, "li");
        assert_eq!(bundle.text, "h1");
    }
}
