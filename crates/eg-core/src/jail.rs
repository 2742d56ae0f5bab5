//! Jail Registry
//!
//! Owns every original node that has been swapped out for a placeholder.
//! A detached original stays alive only through its entry here; releasing
//! hands it back to the document and drops the entry.

use std::collections::HashMap;

use uuid::Uuid;

use crate::dom::{Dom, DomError};
use crate::redact::Redactor;

/// Marker attribute carried by every placeholder. Its value is the jail id.
pub const JAIL_ATTRIBUTE: &str = "data-emoguard-id";

const JAIL_ID_PREFIX: &str = "emoguard-";

/// Bound on `release_all` rounds; each round restores one nesting level.
pub const MAX_RELEASE_ROUNDS: usize = 64;

/// What a placeholder shows in place of the original.
#[derive(Debug, Clone, Copy)]
pub enum Placeholder<'a> {
    /// Shallow clone filled with the glyph markup.
    Glyph(&'a str),
    /// Deep clone with keyword matches replaced by the glyph markup.
    Redacted { redactor: &'a Redactor, glyph: &'a str },
}

/// Map from jail id to the original node it stands in for.
#[derive(Debug)]
pub struct JailRegistry<N> {
    cells: HashMap<String, N>,
}

impl<N> Default for JailRegistry<N> {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }
}

impl<N: Clone> JailRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    /// The original held under `id`.
    pub fn get(&self, id: &str) -> Option<&N> {
        self.cells.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Drop every entry without touching the document.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Swap `original` for a placeholder and take ownership of it.
    pub fn hide<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        original: &N,
        placeholder: Placeholder<'_>,
    ) -> Result<String, DomError> {
        let cell = match placeholder {
            Placeholder::Glyph(glyph) => {
                let cell = if dom.tag_name(original) == "img" {
                    dom.create_element(original, "span")?
                } else {
                    dom.clone_node(original, false)?
                };
                dom.set_inner_html(&cell, glyph)?;
                cell
            }
            Placeholder::Redacted { redactor, glyph } => {
                let cell = dom.clone_node(original, true)?;
                let markup = dom.inner_html(&cell);
                dom.set_inner_html(&cell, &redactor.redact(&markup, glyph))?;
                cell
            }
        };

        let id = new_jail_id();
        dom.set_attribute(&cell, JAIL_ATTRIBUTE, &id)?;
        dom.replace_node(original, &cell)?;
        self.cells.insert(id.clone(), original.clone());
        Ok(id)
    }

    /// Put the original for `id` back where its placeholder is.
    ///
    /// Unknown ids are a no-op. A known id whose placeholder has left the
    /// document is forgotten and `None` is returned.
    pub fn release<D: Dom<Node = N>>(&mut self, dom: &D, id: &str) -> Result<Option<N>, DomError> {
        if !self.cells.contains_key(id) {
            return Ok(None);
        }

        let selector = format!("[{JAIL_ATTRIBUTE}=\"{id}\"]");
        let placeholder = dom.query_all_documents(&selector)?.into_iter().next();
        let Some(original) = self.cells.remove(id) else {
            return Ok(None);
        };
        match placeholder {
            Some(placeholder) => {
                dom.replace_node(&placeholder, &original)?;
                Ok(Some(original))
            }
            None => {
                log::debug!("placeholder {id} is gone from the document");
                Ok(None)
            }
        }
    }

    /// Restore every live placeholder until none remain.
    ///
    /// Originals can themselves contain placeholders from earlier passes, so
    /// the document is re-queried after each round. A placeholder whose id
    /// is unknown loses its marker instead. Returns the number restored.
    pub fn release_all<D: Dom<Node = N>>(&mut self, dom: &D) -> Result<usize, DomError> {
        let selector = format!("[{JAIL_ATTRIBUTE}]");
        let mut released = 0;

        for _ in 0..MAX_RELEASE_ROUNDS {
            let placeholders = dom.query_all_documents(&selector)?;
            if placeholders.is_empty() {
                return Ok(released);
            }

            for placeholder in placeholders {
                let id = dom.attribute(&placeholder, JAIL_ATTRIBUTE).unwrap_or_default();
                match self.cells.remove(&id) {
                    Some(original) => match dom.replace_node(&placeholder, &original) {
                        Ok(()) => released += 1,
                        Err(err) => {
                            log::warn!("could not restore {id}: {err}");
                            dom.remove_attribute(&placeholder, JAIL_ATTRIBUTE)?;
                        }
                    },
                    None => {
                        log::warn!("placeholder {id} has no jailed original");
                        dom.remove_attribute(&placeholder, JAIL_ATTRIBUTE)?;
                    }
                }
            }
        }

        log::warn!("release_all stopped after {MAX_RELEASE_ROUNDS} rounds");
        Ok(released)
    }
}

fn new_jail_id() -> String {
    format!("{JAIL_ID_PREFIX}{}", Uuid::new_v4().simple())
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::HtmlDom;

    fn first(dom: &HtmlDom, selector: &str) -> ego_tree::NodeId {
        dom.query_all_documents(selector).unwrap().remove(0)
    }

    #[test]
    fn element_hide_keeps_attributes_and_drops_children() {
        let dom = HtmlDom::parse("<div><p class=note>spoiler <b>here</b></p></div>");
        let mut jail = JailRegistry::new();
        let p = first(&dom, "p");

        let id = jail.hide(&dom, &p, Placeholder::Glyph("XX")).unwrap();

        assert!(id.starts_with(JAIL_ID_PREFIX));
        let cell = first(&dom, "p");
        assert_eq!(dom.attribute(&cell, "class").as_deref(), Some("note"));
        assert_eq!(dom.attribute(&cell, JAIL_ATTRIBUTE).as_deref(), Some(id.as_str()));
        assert_eq!(dom.inner_html(&cell), "XX");
        assert_eq!(jail.len(), 1);
        assert_eq!(dom.text_content(jail.get(&id).unwrap()), "spoiler here");
    }

    #[test]
    fn images_become_spans() {
        let dom = HtmlDom::parse("<p><img src=a.png alt=spoiler></p>");
        let mut jail = JailRegistry::new();
        jail.hide(&dom, &first(&dom, "img"), Placeholder::Glyph("X")).unwrap();

        assert!(dom.query_all_documents("img").unwrap().is_empty());
        let span = first(&dom, "span");
        assert_eq!(dom.inner_html(&span), "X");
        assert!(dom.attribute(&span, "src").is_none());
    }

    #[test]
    fn text_hide_redacts_markup() {
        let dom = HtmlDom::parse("<div>Before <i>Spoiler</i> after</div>");
        let mut jail = JailRegistry::new();
        let redactor = Redactor::new(&["spoiler".to_string()]).unwrap();

        jail.hide(
            &dom,
            &first(&dom, "div"),
            Placeholder::Redacted { redactor: &redactor, glyph: "X" },
        )
        .unwrap();

        assert_eq!(dom.inner_html(&first(&dom, "div")), "Before <i>X</i> after");
    }

    #[test]
    fn release_restores_original() {
        let dom = HtmlDom::parse("<ul><li id=one>spoiler</li><li>fine</li></ul>");
        let before = dom.to_html();
        let mut jail = JailRegistry::new();

        let id = jail.hide(&dom, &first(&dom, "#one"), Placeholder::Glyph("X")).unwrap();
        assert_ne!(dom.to_html(), before);

        let restored = jail.release(&dom, &id).unwrap();
        assert!(restored.is_some());
        assert_eq!(dom.to_html(), before);
        assert!(jail.is_empty());
    }

    #[test]
    fn release_unknown_id_is_noop() {
        let dom = HtmlDom::parse("<p>x</p>");
        let mut jail = JailRegistry::new();
        assert!(jail.release(&dom, "emoguard-missing").unwrap().is_none());
    }

    #[test]
    fn release_all_reaches_fixed_point_through_nesting() {
        let dom = HtmlDom::parse("<section><div><span>spoiler</span> tail</div></section>");
        let before = dom.to_html();
        let mut jail = JailRegistry::new();

        jail.hide(&dom, &first(&dom, "span"), Placeholder::Glyph("X")).unwrap();
        jail.hide(&dom, &first(&dom, "div"), Placeholder::Glyph("Y")).unwrap();
        assert_eq!(jail.len(), 2);

        let released = jail.release_all(&dom).unwrap();

        assert_eq!(released, 2);
        assert!(jail.is_empty());
        assert!(dom.query_all_documents(&format!("[{JAIL_ATTRIBUTE}]")).unwrap().is_empty());
        assert_eq!(dom.to_html(), before);
    }

    #[test]
    fn release_all_strips_foreign_markers() {
        let dom = HtmlDom::parse(&format!("<p {JAIL_ATTRIBUTE}=emoguard-copied>x</p>"));
        let mut jail: JailRegistry<ego_tree::NodeId> = JailRegistry::new();

        assert_eq!(jail.release_all(&dom).unwrap(), 0);
        assert!(dom.query_all_documents(&format!("[{JAIL_ATTRIBUTE}]")).unwrap().is_empty());
        assert_eq!(dom.text_content(&first(&dom, "p")), "x");
    }
}
