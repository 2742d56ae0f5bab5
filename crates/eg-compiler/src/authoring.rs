//! Rule authoring
//!
//! Checks applied before a rule is stored. The engine trusts whatever it is
//! given, so malformed selectors and illegal mode pairs stop here.

use eg_core::html::parse_selector;
use eg_core::types::{HideMode, Rule, SearchMode, Site, ALL_SITES};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthoringError {
    #[error("selector is empty")]
    EmptyPattern,
    #[error("invalid selector {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("{pattern:?} is already registered for {domain}")]
    Duplicate { domain: String, pattern: String },
    #[error("text-hide rules cannot use deep search")]
    DeepTextHide,
    #[error("no rule {pattern:?} for {domain}")]
    UnknownRule { domain: String, pattern: String },
}

/// Trim `pattern` and check that it parses as a selector list.
pub fn validate_pattern(pattern: &str) -> Result<String, AuthoringError> {
    validate_pattern_with(pattern, |pattern| {
        parse_selector(pattern).map(drop).map_err(|err| err.to_string())
    })
}

/// [`validate_pattern`] with the selector check supplied by the caller. The
/// browser build passes a trial `querySelector`.
pub fn validate_pattern_with<F>(pattern: &str, check: F) -> Result<String, AuthoringError>
where
    F: FnOnce(&str) -> Result<(), String>,
{
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(AuthoringError::EmptyPattern);
    }
    check(pattern).map_err(|reason| AuthoringError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    })?;
    Ok(pattern.to_string())
}

/// Append `rule` to the RuleSet for `domain`, creating the set if needed.
pub fn add_rule(sites: &mut Vec<Site>, domain: &str, mut rule: Rule) -> Result<(), AuthoringError> {
    rule.pattern = validate_pattern(&rule.pattern)?;
    if rule.hide_mode == HideMode::Text && rule.search_mode == SearchMode::Deep {
        return Err(AuthoringError::DeepTextHide);
    }

    let site = match sites.iter().position(|site| site.domain == domain) {
        Some(index) => &mut sites[index],
        None => {
            sites.push(Site::new(domain));
            let last = sites.len() - 1;
            &mut sites[last]
        }
    };
    if site.rules.iter().any(|existing| existing.pattern == rule.pattern) {
        return Err(AuthoringError::Duplicate {
            domain: domain.to_string(),
            pattern: rule.pattern,
        });
    }

    log::debug!("adding rule {:?} for {domain}", rule.pattern);
    site.rules.push(rule);
    Ok(())
}

/// Switch a rule's hide mode. Text-hide forces shallow search.
pub fn set_hide_mode(
    sites: &mut [Site],
    domain: &str,
    pattern: &str,
    hide_mode: HideMode,
) -> Result<(), AuthoringError> {
    let rule = find_rule(sites, domain, pattern)?;
    rule.hide_mode = hide_mode;
    if hide_mode == HideMode::Text {
        rule.search_mode = SearchMode::Shallow;
    }
    Ok(())
}

pub fn set_search_mode(
    sites: &mut [Site],
    domain: &str,
    pattern: &str,
    search_mode: SearchMode,
) -> Result<(), AuthoringError> {
    let rule = find_rule(sites, domain, pattern)?;
    if rule.hide_mode == HideMode::Text && search_mode == SearchMode::Deep {
        return Err(AuthoringError::DeepTextHide);
    }
    rule.search_mode = search_mode;
    Ok(())
}

/// Flip a rule between active and suppressed. Returns the new suppressed flag.
pub fn toggle_suppressed(sites: &mut [Site], domain: &str, pattern: &str) -> Result<bool, AuthoringError> {
    let rule = find_rule(sites, domain, pattern)?;
    rule.suppressed = !rule.suppressed;
    Ok(rule.suppressed)
}

pub fn remove_rule(sites: &mut [Site], domain: &str, pattern: &str) -> Result<Rule, AuthoringError> {
    let site = sites
        .iter_mut()
        .find(|site| site.domain == domain)
        .ok_or_else(|| unknown(domain, pattern))?;
    let index = site
        .rules
        .iter()
        .position(|rule| rule.pattern == pattern)
        .ok_or_else(|| unknown(domain, pattern))?;
    Ok(site.rules.remove(index))
}

/// Drop RuleSets that carry nothing: no rules and not switched off. The
/// all-sites set is always kept.
pub fn remove_empty_sites(sites: &mut Vec<Site>) {
    sites.retain(|site| !site.rules.is_empty() || !site.enabled || site.domain == ALL_SITES);
}

fn find_rule<'a>(sites: &'a mut [Site], domain: &str, pattern: &str) -> Result<&'a mut Rule, AuthoringError> {
    sites
        .iter_mut()
        .find(|site| site.domain == domain)
        .and_then(|site| site.rules.iter_mut().find(|rule| rule.pattern == pattern))
        .ok_or_else(|| unknown(domain, pattern))
}

fn unknown(domain: &str, pattern: &str) -> AuthoringError {
    AuthoringError::UnknownRule {
        domain: domain.to_string(),
        pattern: pattern.to_string(),
    }
}
