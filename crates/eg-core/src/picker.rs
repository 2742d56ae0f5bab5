//! Interactive Picker
//!
//! Hover highlights an element and previews its selector; click turns that
//! selector into a new element-hide rule. Listener wiring lives with the
//! host; this module only tracks the session and the highlight.

use crate::dom::Dom;

/// Class added to the hovered element while picking.
pub const HIGHLIGHT_CLASS: &str = "emoguard-highlight";

/// Name shown at the foot of confirmation messages.
pub const APP_NAME: &str = "EmoGuard";

const RULE_LINE: &str = "------------------------------------------------------------";

#[derive(Debug)]
pub struct Picker<N> {
    active: bool,
    hovered: Option<N>,
}

impl<N> Default for Picker<N> {
    fn default() -> Self {
        Self {
            active: false,
            hovered: None,
        }
    }
}

impl<N: Clone> Picker<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a session. Returns false if one was already running.
    pub fn enable(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        true
    }

    /// End the session and drop any highlight. Returns false if no session
    /// was running.
    pub fn disable<D: Dom<Node = N>>(&mut self, dom: &D) -> bool {
        if !self.active {
            return false;
        }
        self.clear_highlight(dom);
        self.active = false;
        true
    }

    /// Highlight `node` and return its selector for live preview.
    pub fn hover<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) -> Option<String> {
        if !self.active || dom.tag_name(node).is_empty() {
            return None;
        }
        if let Err(err) = dom.add_class(node, HIGHLIGHT_CLASS) {
            log::warn!("could not highlight element: {err}");
        }
        self.hovered = Some(node.clone());
        Some(selector_for(dom, node))
    }

    pub fn leave<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) {
        if !self.active {
            return;
        }
        if let Err(err) = dom.remove_class(node, HIGHLIGHT_CLASS) {
            log::warn!("could not clear highlight: {err}");
        }
        self.hovered = None;
    }

    /// Finish the session on `node`, returning the selector to register.
    pub fn pick<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) -> Option<String> {
        if !self.active || dom.tag_name(node).is_empty() {
            return None;
        }
        if let Err(err) = dom.remove_class(node, HIGHLIGHT_CLASS) {
            log::warn!("could not clear highlight: {err}");
        }
        let selector = selector_for(dom, node);
        self.disable(dom);
        Some(selector)
    }

    fn clear_highlight<D: Dom<Node = N>>(&mut self, dom: &D) {
        if let Some(node) = self.hovered.take() {
            if let Err(err) = dom.remove_class(&node, HIGHLIGHT_CLASS) {
                log::warn!("could not clear highlight: {err}");
            }
        }
    }
}

/// `tag#id.class1.class2`. Not checked for uniqueness on the page.
pub fn selector_for<D: Dom>(dom: &D, node: &D::Node) -> String {
    let mut selector = dom.tag_name(node);
    if let Some(id) = dom.attribute(node, "id").filter(|id| !id.is_empty()) {
        selector.push('#');
        selector.push_str(&id);
    }
    for class in dom.class_names(node) {
        if class == HIGHLIGHT_CLASS {
            continue;
        }
        selector.push('.');
        selector.push_str(&class);
    }
    selector
}

/// Confirmation shown after a rule is registered.
pub fn registration_message(heading: &str, selector: &str) -> String {
    format!("{heading}\n{RULE_LINE}\n\n{selector}\n\n{RULE_LINE}\nby {APP_NAME}")
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::HtmlDom;

    fn node(dom: &HtmlDom, selector: &str) -> ego_tree::NodeId {
        dom.query_all_documents(selector).unwrap().remove(0)
    }

    #[test]
    fn builds_tag_id_and_classes() {
        let dom = HtmlDom::parse("<div id=main class='card wide'>x</div><span>y</span>");
        assert_eq!(selector_for(&dom, &node(&dom, "div")), "div#main.card.wide");
        assert_eq!(selector_for(&dom, &node(&dom, "span")), "span");
    }

    #[test]
    fn hover_highlights_and_leave_clears() {
        let dom = HtmlDom::parse("<p class=lead>x</p>");
        let p = node(&dom, "p");
        let mut picker = Picker::new();
        assert!(picker.enable());

        assert_eq!(picker.hover(&dom, &p).as_deref(), Some("p.lead"));
        assert_eq!(dom.class_names(&p), vec!["lead", HIGHLIGHT_CLASS]);
        // Highlight never leaks into the selector.
        assert_eq!(selector_for(&dom, &p), "p.lead");

        picker.leave(&dom, &p);
        assert_eq!(dom.class_names(&p), vec!["lead"]);
    }

    #[test]
    fn enable_is_idempotent() {
        let dom = HtmlDom::parse("<p>x</p>");
        let mut picker: Picker<ego_tree::NodeId> = Picker::new();
        assert!(picker.enable());
        assert!(!picker.enable());
        assert!(picker.disable(&dom));
        assert!(!picker.disable(&dom));
    }

    #[test]
    fn pick_ends_session() {
        let dom = HtmlDom::parse("<li id=item>x</li>");
        let li = node(&dom, "li");
        let mut picker = Picker::new();
        picker.enable();
        picker.hover(&dom, &li);

        assert_eq!(picker.pick(&dom, &li).as_deref(), Some("li#item"));
        assert!(!picker.is_active());
        assert!(dom.class_names(&li).is_empty());
        assert_eq!(picker.pick(&dom, &li), None);
    }

    #[test]
    fn inactive_picker_ignores_pointer() {
        let dom = HtmlDom::parse("<p>x</p>");
        let p = node(&dom, "p");
        let mut picker = Picker::new();
        assert_eq!(picker.hover(&dom, &p), None);
        assert!(dom.class_names(&p).is_empty());
    }

    #[test]
    fn message_layout() {
        let message = registration_message("Selector registered", "p.lead");
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(lines[0], "Selector registered");
        assert_eq!(lines[3], "p.lead");
        assert_eq!(lines[2], "");
        assert!(lines[1].chars().all(|c| c == '-'));
        assert_eq!(lines.last(), Some(&"by EmoGuard"));
    }
}
