//! Keyword Matcher
//!
//! Detection is a case-sensitive substring search. Redaction (see
//! [`crate::redact`]) is case-insensitive.

use crate::dom::Dom;
use crate::jail::{JailRegistry, JAIL_ATTRIBUTE};
use crate::types::SearchMode;

/// Whether `element` may be jailed at all: visible and not a placeholder.
pub fn is_candidate<D: Dom>(dom: &D, element: &D::Node) -> bool {
    !dom.is_visibility_hidden(element) && dom.attribute(element, JAIL_ATTRIBUTE).is_none()
}

/// Whether `element` contains any of `keywords` under `mode`.
///
/// Deep search also matches an element whose markup already holds a jailed
/// descendant's id.
pub fn contains_keyword<D: Dom>(
    dom: &D,
    element: &D::Node,
    keywords: &[String],
    mode: SearchMode,
    jail: &JailRegistry<D::Node>,
) -> bool {
    let text = match mode {
        SearchMode::Shallow => dom.direct_text(element).join(","),
        SearchMode::Deep => dom.text_content(element),
    };
    let attributes = dom.attribute_values(element).join(",");

    let found = keywords
        .iter()
        .filter(|keyword| !keyword.is_empty())
        .any(|keyword| text.contains(keyword.as_str()) || attributes.contains(keyword.as_str()));

    found || (mode == SearchMode::Deep && holds_jailed(dom, element, jail))
}

fn holds_jailed<D: Dom>(dom: &D, element: &D::Node, jail: &JailRegistry<D::Node>) -> bool {
    if jail.is_empty() {
        return false;
    }
    let markup = dom.inner_html(element);
    jail.ids().any(|id| markup.contains(id))
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::HtmlDom;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    fn check(html: &str, selector: &str, mode: SearchMode) -> bool {
        let dom = HtmlDom::parse(html);
        let element = dom.query_all_documents(selector).unwrap().remove(0);
        contains_keyword(&dom, &element, &keywords(&["spoiler"]), mode, &JailRegistry::new())
    }

    #[test]
    fn shallow_ignores_child_elements() {
        assert!(check("<p>big spoiler</p>", "p", SearchMode::Shallow));
        assert!(!check("<p><b>spoiler</b></p>", "p", SearchMode::Shallow));
        assert!(check("<p><b>spoiler</b></p>", "p", SearchMode::Deep));
    }

    #[test]
    fn attributes_count_in_both_modes() {
        assert!(check("<a title='spoiler inside'>link</a>", "a", SearchMode::Shallow));
        assert!(check("<img alt='a spoiler'>", "img", SearchMode::Deep));
    }

    #[test]
    fn detection_is_case_sensitive() {
        assert!(!check("<p>SPOILER</p>", "p", SearchMode::Shallow));
        assert!(!check("<p>Spoiler</p>", "p", SearchMode::Deep));
    }

    #[test]
    fn empty_keyword_matches_nothing() {
        let dom = HtmlDom::parse("<p>text</p>");
        let p = dom.query_all_documents("p").unwrap().remove(0);
        assert!(!contains_keyword(&dom, &p, &keywords(&[""]), SearchMode::Deep, &JailRegistry::new()));
    }

    #[test]
    fn placeholders_and_hidden_elements_are_not_candidates() {
        let dom = HtmlDom::parse(&format!(
            "<p id=a>x</p><p id=b style='visibility:hidden'>x</p><p id=c {JAIL_ATTRIBUTE}=emoguard-1>x</p>"
        ));
        let candidates: Vec<_> = dom
            .query_all_documents("p")
            .unwrap()
            .into_iter()
            .filter(|p| is_candidate(&dom, p))
            .collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(dom.attribute(&candidates[0], "id").as_deref(), Some("a"));
    }
}
