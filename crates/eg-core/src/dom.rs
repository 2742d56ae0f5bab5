//! Document abstraction the guard engine runs against.
//!
//! The browser build implements [`Dom`] with `web-sys`; the `html` feature
//! provides an in-memory implementation over `scraper`.

/// Errors raised by a [`Dom`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("node is not attached to a parent")]
    Detached,
    #[error("node is not an element")]
    NotAnElement,
    #[error("host error: {0}")]
    Host(String),
}

/// Operations the engine needs from a document and its same-origin frames.
///
/// All methods take `&self`; implementations mutate through the document's
/// own interior mutability, as the browser DOM does.
pub trait Dom {
    /// Handle to a node. Cloning a handle never clones the node itself.
    type Node: Clone;

    /// The top document followed by every same-origin iframe document whose
    /// content has loaded. Cross-origin frames are silently absent.
    fn documents(&self) -> Vec<Self::Node>;

    /// Elements below `root` matching `selector`, in document order.
    fn query_selector_all(&self, root: &Self::Node, selector: &str)
        -> Result<Vec<Self::Node>, DomError>;

    /// Lowercase tag name, empty for non-elements.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), DomError>;

    /// Values of every attribute on the node.
    fn attribute_values(&self, node: &Self::Node) -> Vec<String>;

    /// Contents of the node's direct text children.
    fn direct_text(&self, node: &Self::Node) -> Vec<String>;

    /// Concatenated text of all descendants.
    fn text_content(&self, node: &Self::Node) -> String;

    fn inner_html(&self, node: &Self::Node) -> String;

    fn set_inner_html(&self, node: &Self::Node, html: &str) -> Result<(), DomError>;

    /// Inline `visibility: hidden` check. Layout is never computed.
    fn is_visibility_hidden(&self, node: &Self::Node) -> bool;

    fn clone_node(&self, node: &Self::Node, deep: bool) -> Result<Self::Node, DomError>;

    /// New detached element owned by `owner`'s document.
    fn create_element(&self, owner: &Self::Node, tag: &str) -> Result<Self::Node, DomError>;

    /// Whether the node is reachable from a document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Put `new` at `old`'s position and detach `old`.
    fn replace_node(&self, old: &Self::Node, new: &Self::Node) -> Result<(), DomError>;

    fn class_names(&self, node: &Self::Node) -> Vec<String>;

    fn add_class(&self, node: &Self::Node, class: &str) -> Result<(), DomError>;

    fn remove_class(&self, node: &Self::Node, class: &str) -> Result<(), DomError>;

    /// Query every reachable document.
    fn query_all_documents(&self, selector: &str) -> Result<Vec<Self::Node>, DomError> {
        let mut found = Vec::new();
        for document in self.documents() {
            found.extend(self.query_selector_all(&document, selector)?);
        }
        Ok(found)
    }
}
