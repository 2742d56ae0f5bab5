//! Live page document for the guard engine.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlIFrameElement, Node};

use eg_core::dom::{Dom, DomError};

pub struct BrowserDom {
    document: Document,
}

impl BrowserDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

fn host_error(err: JsValue) -> DomError {
    DomError::Host(format!("{err:?}"))
}

fn element(node: &Node) -> Result<&Element, DomError> {
    node.dyn_ref::<Element>().ok_or(DomError::NotAnElement)
}

impl Dom for BrowserDom {
    type Node = Node;

    fn documents(&self) -> Vec<Node> {
        let mut documents: Vec<Node> = vec![self.document.clone().into()];
        let iframes = self.document.get_elements_by_tag_name("iframe");
        for i in 0..iframes.length() {
            // Cross-origin frames have no contentDocument.
            let Some(frame) = iframes
                .item(i)
                .and_then(|el| el.dyn_into::<HtmlIFrameElement>().ok())
                .and_then(|frame| frame.content_document())
            else {
                continue;
            };
            let loaded = frame.body().is_some_and(|body| !body.inner_html().is_empty());
            if loaded {
                documents.push(frame.into());
            }
        }
        documents
    }

    fn query_selector_all(&self, root: &Node, selector: &str) -> Result<Vec<Node>, DomError> {
        let list = if let Some(document) = root.dyn_ref::<Document>() {
            document.query_selector_all(selector)
        } else {
            element(root)?.query_selector_all(selector)
        }
        .map_err(|err| DomError::InvalidSelector(format!("{selector}: {err:?}")))?;

        Ok((0..list.length()).filter_map(|i| list.get(i)).collect())
    }

    fn tag_name(&self, node: &Node) -> String {
        node.dyn_ref::<Element>()
            .map(|el| el.tag_name().to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), DomError> {
        element(node)?.set_attribute(name, value).map_err(host_error)
    }

    fn remove_attribute(&self, node: &Node, name: &str) -> Result<(), DomError> {
        element(node)?.remove_attribute(name).map_err(host_error)
    }

    fn attribute_values(&self, node: &Node) -> Vec<String> {
        let Some(el) = node.dyn_ref::<Element>() else {
            return Vec::new();
        };
        el.get_attribute_names()
            .iter()
            .filter_map(|name| name.as_string())
            .filter_map(|name| el.get_attribute(&name))
            .collect()
    }

    fn direct_text(&self, node: &Node) -> Vec<String> {
        let children = node.child_nodes();
        (0..children.length())
            .filter_map(|i| children.get(i))
            .filter(|child| child.node_type() == Node::TEXT_NODE)
            .map(|child| child.text_content().unwrap_or_default())
            .collect()
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn inner_html(&self, node: &Node) -> String {
        node.dyn_ref::<Element>().map(Element::inner_html).unwrap_or_default()
    }

    fn set_inner_html(&self, node: &Node, html: &str) -> Result<(), DomError> {
        element(node)?.set_inner_html(html);
        Ok(())
    }

    fn is_visibility_hidden(&self, node: &Node) -> bool {
        node.dyn_ref::<HtmlElement>()
            .and_then(|el| el.style().get_property_value("visibility").ok())
            .is_some_and(|value| value == "hidden")
    }

    fn clone_node(&self, node: &Node, deep: bool) -> Result<Node, DomError> {
        node.clone_node_with_deep(deep).map_err(host_error)
    }

    fn create_element(&self, owner: &Node, tag: &str) -> Result<Node, DomError> {
        let document = match owner.dyn_ref::<Document>() {
            Some(document) => document.clone(),
            None => owner.owner_document().ok_or(DomError::Detached)?,
        };
        document.create_element(tag).map(Node::from).map_err(host_error)
    }

    fn is_connected(&self, node: &Node) -> bool {
        node.is_connected()
    }

    fn replace_node(&self, old: &Node, new: &Node) -> Result<(), DomError> {
        let parent = old.parent_node().ok_or(DomError::Detached)?;
        parent.replace_child(new, old).map(|_| ()).map_err(host_error)
    }

    fn class_names(&self, node: &Node) -> Vec<String> {
        let Some(el) = node.dyn_ref::<Element>() else {
            return Vec::new();
        };
        let list = el.class_list();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn add_class(&self, node: &Node, class: &str) -> Result<(), DomError> {
        element(node)?.class_list().add_1(class).map_err(host_error)
    }

    fn remove_class(&self, node: &Node, class: &str) -> Result<(), DomError> {
        element(node)?.class_list().remove_1(class).map_err(host_error)
    }
}
