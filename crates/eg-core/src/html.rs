//! In-memory document backed by `scraper`.
//!
//! Used by the CLI to guard saved pages and by the engine's tests. Nodes live
//! in one `ego_tree` arena: the page, any attached frame documents, and every
//! detached node (clones, jailed originals). Same-origin frames are modelled
//! by attaching a parsed document to an `<iframe>`.

use std::cell::RefCell;

use ego_tree::{NodeId, NodeMut, NodeRef};
use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::StrTendril;
use html5ever::{namespace_url, ns, LocalName};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};

use crate::dom::{Dom, DomError};

/// Parse a selector list with the same grammar `querySelectorAll` accepts
/// for static documents.
pub fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|err| DomError::InvalidSelector(format!("{selector}: {err}")))
}

struct Frame {
    element: NodeId,
    document: NodeId,
    same_origin: bool,
}

/// Owned copy of a subtree, used to move nodes across trees and to clone
/// within one.
struct Subtree {
    value: Node,
    children: Vec<Subtree>,
}

impl Subtree {
    fn capture(node: NodeRef<'_, Node>, deep: bool) -> Self {
        let children = if deep {
            node.children().map(|child| Subtree::capture(child, true)).collect()
        } else {
            Vec::new()
        };
        Self {
            value: node.value().clone(),
            children,
        }
    }

    fn append_to(self, parent: &mut NodeMut<'_, Node>) {
        let mut node = parent.append(self.value);
        for child in self.children {
            child.append_to(&mut node);
        }
    }
}

/// A parsed page plus any frame documents attached to it.
pub struct HtmlDom {
    html: RefCell<Html>,
    frames: RefCell<Vec<Frame>>,
}

impl HtmlDom {
    pub fn parse(html: &str) -> Self {
        Self {
            html: RefCell::new(Html::parse_document(html)),
            frames: RefCell::new(Vec::new()),
        }
    }

    pub fn document(&self) -> NodeId {
        self.html.borrow().tree.root().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element(self.document(), "body")
    }

    /// Load `html` as the content document of `iframe`. Cross-origin frames
    /// are kept but never returned by [`Dom::documents`].
    pub fn attach_frame(&self, iframe: &NodeId, html: &str, same_origin: bool) {
        let parsed = Html::parse_document(html);
        let children = parsed
            .tree
            .root()
            .children()
            .map(|child| Subtree::capture(child, true))
            .collect();
        let document = self.plant(Node::Document, children);
        self.frames.borrow_mut().push(Frame {
            element: *iframe,
            document,
            same_origin,
        });
    }

    pub fn frame_document(&self, iframe: &NodeId) -> Option<NodeId> {
        self.frames
            .borrow()
            .iter()
            .find(|frame| frame.element == *iframe)
            .map(|frame| frame.document)
    }

    /// Parse `html` as a fragment and append the result to `parent`.
    pub fn append_html(&self, parent: &NodeId, html: &str) -> Result<(), DomError> {
        let nodes = parse_fragment(html);
        let mut document = self.html.borrow_mut();
        let mut parent = document.tree.get_mut(*parent).ok_or(DomError::Detached)?;
        if !parent.value().is_element() {
            return Err(DomError::NotAnElement);
        }
        for node in nodes {
            node.append_to(&mut parent);
        }
        Ok(())
    }

    /// Serialize the whole top document.
    pub fn to_html(&self) -> String {
        self.html.borrow().html()
    }

    pub fn outer_html(&self, node: &NodeId) -> String {
        self.read(*node, |node| match ElementRef::wrap(node) {
            Some(element) => element.html(),
            None => serialize_children(node),
        })
        .unwrap_or_default()
    }

    fn read<R>(&self, id: NodeId, f: impl FnOnce(NodeRef<'_, Node>) -> R) -> Option<R> {
        let html = self.html.borrow();
        html.tree.get(id).map(f)
    }

    /// Insert a detached subtree into the arena.
    fn plant(&self, value: Node, children: Vec<Subtree>) -> NodeId {
        let mut html = self.html.borrow_mut();
        let mut root = html.tree.orphan(value);
        for child in children {
            child.append_to(&mut root);
        }
        root.id()
    }

    fn find_element(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.read(root, |node| {
            node.descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .find(|element| element.value().name().eq_ignore_ascii_case(tag))
                .map(|element| element.id())
        })
        .flatten()
    }

    /// Rebuild an element with edited attributes. `scraper` caches id and
    /// class lookups per element, so attributes are never edited in place.
    fn edit_attributes(&self, id: NodeId, edit: impl FnOnce(&mut Vec<Attribute>)) -> Result<(), DomError> {
        let mut html = self.html.borrow_mut();
        let mut node = html.tree.get_mut(id).ok_or(DomError::Detached)?;
        let Node::Element(element) = node.value() else {
            return Err(DomError::NotAnElement);
        };
        let mut attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        edit(&mut attrs);
        *element = Element::new(element.name.clone(), attrs);
        Ok(())
    }
}

impl Dom for HtmlDom {
    type Node = NodeId;

    fn documents(&self) -> Vec<NodeId> {
        let mut documents = vec![self.document()];
        for frame in self.frames.borrow().iter() {
            let loaded = self
                .find_element(frame.document, "body")
                .and_then(|body| self.read(body, |body| body.has_children()))
                .unwrap_or(false);
            if frame.same_origin && loaded && self.is_connected(&frame.element) {
                documents.push(frame.document);
            }
        }
        documents
    }

    fn query_selector_all(&self, root: &NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = parse_selector(selector)?;
        Ok(self
            .read(*root, |root| {
                root.descendants()
                    .skip(1)
                    .filter_map(ElementRef::wrap)
                    .filter(|element| selector.matches(element))
                    .map(|element| element.id())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.read(*node, |node| {
            node.value()
                .as_element()
                .map(|element| element.name().to_ascii_lowercase())
        })
        .flatten()
        .unwrap_or_default()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.read(*node, |node| {
            node.value()
                .as_element()
                .and_then(|element| element.attr(name))
                .map(str::to_string)
        })
        .flatten()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.edit_attributes(*node, |attrs| {
            match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
                Some(attr) => attr.value = StrTendril::from_slice(value),
                None => attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: StrTendril::from_slice(value),
                }),
            }
        })
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) -> Result<(), DomError> {
        self.edit_attributes(*node, |attrs| attrs.retain(|attr| &*attr.name.local != name))
    }

    fn attribute_values(&self, node: &NodeId) -> Vec<String> {
        self.read(*node, |node| match node.value().as_element() {
            Some(element) => element.attrs().map(|(_, value)| value.to_string()).collect(),
            None => Vec::new(),
        })
        .unwrap_or_default()
    }

    fn direct_text(&self, node: &NodeId) -> Vec<String> {
        self.read(*node, |node| {
            node.children()
                .filter_map(|child| child.value().as_text().map(|text| text.text.to_string()))
                .collect()
        })
        .unwrap_or_default()
    }

    fn text_content(&self, node: &NodeId) -> String {
        self.read(*node, |node| {
            let mut text = String::new();
            for descendant in node.descendants() {
                if let Some(chunk) = descendant.value().as_text() {
                    text.push_str(&chunk.text);
                }
            }
            text
        })
        .unwrap_or_default()
    }

    fn inner_html(&self, node: &NodeId) -> String {
        self.read(*node, |node| match ElementRef::wrap(node) {
            Some(element) => element.inner_html(),
            None => serialize_children(node),
        })
        .unwrap_or_default()
    }

    fn set_inner_html(&self, node: &NodeId, html: &str) -> Result<(), DomError> {
        let nodes = parse_fragment(html);
        let mut document = self.html.borrow_mut();
        let tree = &mut document.tree;

        let old_children: Vec<NodeId> = {
            let target = tree.get(*node).ok_or(DomError::Detached)?;
            if !target.value().is_element() {
                return Err(DomError::NotAnElement);
            }
            target.children().map(|child| child.id()).collect()
        };
        for child in old_children {
            if let Some(mut child) = tree.get_mut(child) {
                child.detach();
            }
        }

        let mut target = tree.get_mut(*node).ok_or(DomError::Detached)?;
        for child in nodes {
            child.append_to(&mut target);
        }
        Ok(())
    }

    fn is_visibility_hidden(&self, node: &NodeId) -> bool {
        let Some(style) = self.attribute(node, "style") else {
            return false;
        };
        let visibility = style
            .split(';')
            .filter_map(|declaration| declaration.split_once(':'))
            .filter(|(property, _)| property.trim().eq_ignore_ascii_case("visibility"))
            .map(|(_, value)| value.trim().trim_end_matches("!important").trim().to_ascii_lowercase())
            .last();
        visibility.as_deref() == Some("hidden")
    }

    fn clone_node(&self, node: &NodeId, deep: bool) -> Result<NodeId, DomError> {
        let copy = self
            .read(*node, |node| Subtree::capture(node, deep))
            .ok_or(DomError::Detached)?;
        Ok(self.plant(copy.value, copy.children))
    }

    fn create_element(&self, owner: &NodeId, tag: &str) -> Result<NodeId, DomError> {
        let owned = self
            .read(*owner, |owner| owner.value().is_element() || owner.value().is_document())
            .unwrap_or(false);
        if !owned {
            return Err(DomError::NotAnElement);
        }
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        Ok(self.plant(Node::Element(Element::new(name, Vec::new())), Vec::new()))
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.read(*node, |node| {
            let top = node.ancestors().last().unwrap_or(node);
            top.value().is_document()
        })
        .unwrap_or(false)
    }

    fn replace_node(&self, old: &NodeId, new: &NodeId) -> Result<(), DomError> {
        let mut html = self.html.borrow_mut();
        let attached = html.tree.get(*old).is_some_and(|node| node.parent().is_some());
        if !attached || html.tree.get(*new).is_none() {
            return Err(DomError::Detached);
        }
        if old == new {
            return Ok(());
        }

        let mut old = html.tree.get_mut(*old).ok_or(DomError::Detached)?;
        old.insert_id_before(*new);
        old.detach();
        Ok(())
    }

    fn class_names(&self, node: &NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|value| value.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn add_class(&self, node: &NodeId, class: &str) -> Result<(), DomError> {
        let mut classes = self.class_names(node);
        if classes.iter().any(|existing| existing == class) {
            return Ok(());
        }
        classes.push(class.to_string());
        self.set_attribute(node, "class", &classes.join(" "))
    }

    fn remove_class(&self, node: &NodeId, class: &str) -> Result<(), DomError> {
        let classes = self.class_names(node);
        if !classes.iter().any(|existing| existing == class) {
            return Ok(());
        }
        let kept: Vec<String> = classes.into_iter().filter(|existing| existing != class).collect();
        self.set_attribute(node, "class", &kept.join(" "))
    }
}

/// Top-level nodes of `html` parsed as a body fragment.
fn parse_fragment(html: &str) -> Vec<Subtree> {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .children()
        .map(|child| Subtree::capture(child, true))
        .collect()
}

/// Children of a non-element node (a document) as markup.
fn serialize_children(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    for child in node.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    out.push_str(&element.html());
                }
            }
            Node::Text(text) => escape_text(&text.text, &mut out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(&comment.comment);
                out.push_str("-->");
            }
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push('>');
            }
            _ => {}
        }
    }
    out
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
