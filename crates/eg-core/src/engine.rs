//! Guard Engine
//!
//! Sweeps every reachable document for toxic elements and jails them. The
//! engine owns the live [`EngineState`] and the [`JailRegistry`]; nothing
//! else writes to either.

use crate::dom::{Dom, DomError};
use crate::jail::{JailRegistry, Placeholder};
use crate::keyword::{contains_keyword, is_candidate};
use crate::redact::{escape_html, Redactor};
use crate::state::{has_keywords, EngineState, StatePatch};
use crate::types::{HideMode, SearchMode, SelectorBundle};

/// Failure that aborts a guard pass.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("invalid redaction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub struct GuardEngine<D: Dom> {
    dom: D,
    state: EngineState,
    jail: JailRegistry<D::Node>,
}

impl<D: Dom> GuardEngine<D> {
    pub fn new(dom: D, state: EngineState) -> Self {
        Self {
            dom,
            state,
            jail: JailRegistry::new(),
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn jail(&self) -> &JailRegistry<D::Node> {
        &self.jail
    }

    /// Merge a `setState` payload into the live state.
    pub fn apply(&mut self, patch: StatePatch) {
        self.state.apply(patch);
    }

    /// Flip the power switch. Jailed elements stay jailed.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.state.enabled = enabled;
    }

    /// One pass of `selector` under the given search and hide modes.
    ///
    /// Returns the number of elements jailed. An invalid selector aborts the
    /// pass; a single element that cannot be replaced is skipped.
    pub fn guard(
        &mut self,
        selector: &str,
        keywords: &[String],
        search: SearchMode,
        hide: HideMode,
    ) -> Result<usize, GuardError> {
        if !self.state.enabled || selector.trim().is_empty() || !has_keywords(keywords) {
            return Ok(0);
        }

        let glyph = escape_html(&self.state.placeholder_glyph);
        let redactor = match hide {
            HideMode::Text => Some(Redactor::new(keywords)?),
            HideMode::Element => None,
        };
        let placeholder = match &redactor {
            Some(redactor) => Placeholder::Redacted { redactor, glyph: &glyph },
            None => Placeholder::Glyph(&glyph),
        };

        let candidates = self.dom.query_all_documents(selector)?;
        let mut jailed = 0;
        for element in candidates {
            // An ancestor jailed earlier in this loop took it out of the page.
            if !self.dom.is_connected(&element) {
                continue;
            }
            if !is_candidate(&self.dom, &element)
                || !contains_keyword(&self.dom, &element, keywords, search, &self.jail)
            {
                continue;
            }
            match self.jail.hide(&self.dom, &element, placeholder) {
                Ok(_) => jailed += 1,
                Err(err) => log::warn!("skipping element matched by {selector:?}: {err}"),
            }
        }

        log::debug!("guard {selector:?} ({search:?}, {hide:?}): jailed {jailed}");
        Ok(jailed)
    }

    /// Element-shallow, element-deep and text passes, in that order.
    pub fn guard_all(&mut self, bundle: &SelectorBundle, keywords: &[String]) -> Result<usize, GuardError> {
        let mut jailed = 0;
        for (selector, search, hide) in bundle.passes() {
            jailed += self.guard(selector, keywords, search, hide)?;
        }
        Ok(jailed)
    }

    /// [`guard_all`](Self::guard_all) with the live selectors and keywords.
    pub fn guard_current(&mut self) -> Result<usize, GuardError> {
        let bundle = self.state.selectors.clone();
        let keywords = self.state.keywords.clone();
        self.guard_all(&bundle, &keywords)
    }

    /// Adopt new selectors and keywords, then release everything and sweep
    /// again from scratch. While disabled only the state is updated.
    pub fn refresh(&mut self, bundle: SelectorBundle, keywords: Vec<String>) -> Result<usize, GuardError> {
        self.state.selectors = bundle;
        self.state.keywords = keywords;
        if !self.state.enabled {
            return Ok(0);
        }

        let released = self.jail.release_all(&self.dom)?;
        self.jail.clear();
        log::debug!("refresh released {released} placeholders");
        self.guard_current()
    }

    /// Restore every jailed element.
    pub fn release_all(&mut self) -> Result<usize, DomError> {
        let released = self.jail.release_all(&self.dom)?;
        self.jail.clear();
        Ok(released)
    }
}
