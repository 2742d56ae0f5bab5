//! Selector Compiler
//!
//! Merges the all-sites RuleSet with the active domain's RuleSet into the
//! three comma-joined selectors the engine runs.

use std::collections::HashSet;

use eg_core::types::{HideMode, Rule, SearchMode, SelectorBundle, Site, ALL_SITES};

/// Compile the bundle for `domain` from every stored RuleSet.
pub fn compile_for_domain(sites: &[Site], domain: &str) -> SelectorBundle {
    let rules_for = |name: &str| {
        sites
            .iter()
            .find(|site| site.domain == name)
            .map(|site| site.rules.as_slice())
            .unwrap_or_default()
    };
    compile(rules_for(ALL_SITES), rules_for(domain))
}

/// Merge two RuleSets into an effective selector bundle.
///
/// A visible pattern declared by both sets is dropped from the all-sites side
/// so it appears once. Suppressed rules never contribute.
pub fn compile(all_sites: &[Rule], this_site: &[Rule]) -> SelectorBundle {
    let this_site_patterns: HashSet<&str> = visible(this_site).map(|rule| rule.pattern.as_str()).collect();
    let duplicates: HashSet<&str> = visible(all_sites)
        .map(|rule| rule.pattern.as_str())
        .filter(|pattern| this_site_patterns.contains(pattern))
        .collect();

    let field = |hide: HideMode, search: SearchMode| {
        let from_all = visible(all_sites)
            .filter(|rule| !duplicates.contains(rule.pattern.as_str()))
            .filter(|rule| selects(rule, hide, search));
        let from_this = visible(this_site).filter(|rule| selects(rule, hide, search));
        from_all
            .chain(from_this)
            .map(|rule| rule.pattern.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };

    let bundle = SelectorBundle {
        element_shallow: field(HideMode::Element, SearchMode::Shallow),
        element_deep: field(HideMode::Element, SearchMode::Deep),
        text: field(HideMode::Text, SearchMode::Shallow),
    };
    log::debug!(
        "compiled {} + {} rules ({} shared)",
        all_sites.len(),
        this_site.len(),
        duplicates.len()
    );
    bundle
}

fn visible(rules: &[Rule]) -> impl Iterator<Item = &Rule> {
    rules.iter().filter(|rule| !rule.suppressed)
}

fn selects(rule: &Rule, hide: HideMode, search: SearchMode) -> bool {
    rule.hide_mode == hide && rule.effective_search_mode() == search
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shallow(pattern: &str) -> Rule {
        Rule::new(pattern, HideMode::Element, SearchMode::Shallow)
    }

    #[test]
    fn shared_pattern_appears_once() {
        let bundle = compile(&[shallow("a"), shallow("b")], &[shallow("b"), shallow("c")]);
        assert_eq!(bundle.element_shallow, "a,b,c");
        assert_eq!(bundle.element_deep, "");
        assert_eq!(bundle.text, "");
    }

    #[test]
    fn rules_land_in_their_field() {
        let rules = vec![
            shallow("p"),
            Rule::new("article", HideMode::Element, SearchMode::Deep),
            Rule::new("h1", HideMode::Text, SearchMode::Shallow),
        ];
        let bundle = compile(&rules, &[]);
        assert_eq!(bundle.element_shallow, "p");
        assert_eq!(bundle.element_deep, "article");
        assert_eq!(bundle.text, "h1");
    }

    #[test]
    fn suppressed_rules_are_skipped() {
        let mut hidden = shallow("b");
        hidden.suppressed = true;
        let bundle = compile(&[shallow("a"), hidden.clone()], &[hidden, shallow("c")]);
        assert_eq!(bundle.element_shallow, "a,c");
    }

    #[test]
    fn suppressed_site_rule_does_not_shadow_all_sites() {
        let mut hidden = shallow("a");
        hidden.suppressed = true;
        let bundle = compile(&[shallow("a")], &[hidden]);
        assert_eq!(bundle.element_shallow, "a");
    }

    #[test]
    fn duplicate_across_modes_keeps_site_rule() {
        let all = vec![shallow("p")];
        let this = vec![Rule::new("p", HideMode::Text, SearchMode::Shallow)];
        let bundle = compile(&all, &this);
        assert_eq!(bundle.element_shallow, "");
        assert_eq!(bundle.text, "p");
    }

    #[test]
    fn legacy_deep_text_rule_is_read_as_shallow() {
        let legacy = Rule::new("h2", HideMode::Text, SearchMode::Deep);
        let bundle = compile(&[legacy], &[]);
        assert_eq!(bundle.text, "h2");
        assert_eq!(bundle.element_deep, "");
    }

    #[test]
    fn resolves_sites_by_domain() {
        let mut all = Site::new(ALL_SITES);
        all.rules = vec![shallow("a")];
        let mut news = Site::new("news.example.com");
        news.rules = vec![shallow("li")];
        let mut other = Site::new("other.example.com");
        other.rules = vec![shallow("td")];
        let sites = vec![all, news, other];

        assert_eq!(compile_for_domain(&sites, "news.example.com").element_shallow, "a,li");
        assert_eq!(compile_for_domain(&sites, "unknown.example.com").element_shallow, "a");
        assert!(compile_for_domain(&[], "x").is_empty());
    }
}
