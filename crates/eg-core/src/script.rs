//! Content-script orchestrator
//!
//! One [`ContentScript`] runs per frame. It owns the engine, the watcher and
//! the picker, and routes browser events and inbound commands to them. The
//! host supplies timers, messaging, persistence and pointer capture.

use crate::dom::Dom;
use crate::engine::{GuardEngine, GuardError};
use crate::message::{Command, Outbound};
use crate::picker::{registration_message, Picker};
use crate::state::EngineState;
use crate::types::{HideMode, Rule, SearchMode};
use crate::watcher::{MutationWatcher, Scheduler, WatchOutcome};

/// Browser-side services the content script depends on.
pub trait Host: Scheduler {
    /// Send a message to the extension's other contexts.
    fn post(&mut self, message: Outbound);

    /// Persist a picked rule under `domain`, creating its RuleSet if needed.
    fn register_rule(&mut self, domain: &str, rule: Rule);

    /// Show a confirmation to the user.
    fn notify(&mut self, message: &str);

    /// Attach (`true`) or detach the picker's pointer listeners.
    fn capture_pointer(&mut self, capture: bool);

    /// Localized heading of the rule-registered confirmation.
    fn registration_heading(&self) -> String {
        "The following selector has been registered.".to_string()
    }

    /// Localized heading shown when a picked selector cannot be stored.
    fn rejection_heading(&self) -> String {
        "The following selector could not be registered.".to_string()
    }
}

pub struct ContentScript<D: Dom, H: Host> {
    engine: GuardEngine<D>,
    watcher: MutationWatcher<H::Handle>,
    picker: Picker<D::Node>,
    host: H,
    domain: String,
}

impl<D: Dom, H: Host> ContentScript<D, H> {
    pub fn new(dom: D, state: EngineState, host: H, domain: impl Into<String>) -> Self {
        Self {
            engine: GuardEngine::new(dom, state),
            watcher: MutationWatcher::new(),
            picker: Picker::new(),
            host,
            domain: domain.into(),
        }
    }

    /// Initial sweep at load.
    pub fn start(&mut self) -> Result<usize, GuardError> {
        log::info!("guarding {} ({} keywords)", self.domain, self.engine.state().keywords.len());
        self.engine.guard_current()
    }

    pub fn dispatch(&mut self, command: Command) -> Result<(), GuardError> {
        log::debug!("dispatch {}", command.name());
        let keywords = self.engine.state().keywords.clone();
        match command {
            Command::SetState(patch) => self.engine.apply(patch),
            Command::RefreshSelector(bundle) => {
                self.engine.refresh(bundle, keywords)?;
            }
            Command::RefreshKeyword(keywords) => {
                let bundle = self.engine.state().selectors.clone();
                self.engine.refresh(bundle, keywords)?;
            }
            Command::HideWithKeyword(added) => {
                let bundle = self.engine.state().selectors.clone();
                self.engine.guard_all(&bundle, &added)?;
            }
            Command::HideElementsShallow(selector) => {
                self.engine.guard(&selector, &keywords, SearchMode::Shallow, HideMode::Element)?;
            }
            Command::HideElementsDeep(selector) => {
                self.engine.guard(&selector, &keywords, SearchMode::Deep, HideMode::Element)?;
            }
            Command::HideText(selector) => {
                self.engine.guard(&selector, &keywords, SearchMode::Shallow, HideMode::Text)?;
            }
            Command::TogglePower(enabled) => self.engine.set_enabled(enabled),
            Command::EnableInteractiveMode => {
                if self.picker.enable() {
                    self.host.capture_pointer(true);
                }
            }
            Command::DisableInteractiveMode => {
                if self.picker.disable(self.engine.dom()) {
                    self.host.capture_pointer(false);
                }
            }
        }
        Ok(())
    }

    /// A `MutationObserver` batch arrived.
    pub fn on_mutations(&mut self) -> Result<(), GuardError> {
        match self.watcher.observe(self.engine.state(), &mut self.host) {
            WatchOutcome::GuardNow => {
                self.engine.guard_current()?;
            }
            WatchOutcome::Deferred | WatchOutcome::Ignored => {}
        }
        Ok(())
    }

    /// The debounce timer expired.
    pub fn on_timer(&mut self) -> Result<(), GuardError> {
        if self.watcher.fire() {
            self.engine.guard_current()?;
        }
        Ok(())
    }

    pub fn on_pointer_over(&mut self, node: &D::Node) {
        if let Some(selector) = self.picker.hover(self.engine.dom(), node) {
            self.host.post(Outbound::SetSelector(selector));
        }
    }

    pub fn on_pointer_out(&mut self, node: &D::Node) {
        self.picker.leave(self.engine.dom(), node);
    }

    /// Register the clicked element's selector as a rule and hide matches
    /// right away. Returns true when the click was consumed by the picker.
    ///
    /// The selector is tried against the page first; one the page's own
    /// parser refuses is never handed to the host and the user is told so.
    pub fn on_click(&mut self, node: &D::Node) -> Result<bool, GuardError> {
        let Some(selector) = self.picker.pick(self.engine.dom(), node) else {
            return Ok(false);
        };

        if let Err(err) = self.engine.dom().query_all_documents(&selector) {
            log::warn!("picked selector rejected: {err}");
            let heading = self.host.rejection_heading();
            self.host.notify(&registration_message(&heading, &selector));
            self.host.capture_pointer(false);
            return Ok(true);
        }

        self.host.register_rule(&self.domain, Rule::picked(selector.clone()));
        let keywords = self.engine.state().keywords.clone();
        let guarded = self
            .engine
            .guard(&selector, &keywords, SearchMode::Shallow, HideMode::Element);

        let heading = self.host.registration_heading();
        self.host.notify(&registration_message(&heading, &selector));
        self.host.capture_pointer(false);

        guarded.map(|_| true)
    }

    pub fn engine(&self) -> &GuardEngine<D> {
        &self.engine
    }

    pub fn picker(&self) -> &Picker<D::Node> {
        &self.picker
    }

    pub fn watcher(&self) -> &MutationWatcher<H::Handle> {
        &self.watcher
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::HtmlDom;
    use crate::jail::JAIL_ATTRIBUTE;
    use crate::state::StatePatch;
    use crate::types::SelectorBundle;

    #[derive(Default)]
    struct FakeHost {
        next_timer: u32,
        armed: Vec<u32>,
        posted: Vec<Outbound>,
        rules: Vec<(String, Rule)>,
        notices: Vec<String>,
        captures: Vec<bool>,
    }

    impl Scheduler for FakeHost {
        type Handle = u32;

        fn schedule(&mut self, _delay_ms: u32) -> u32 {
            self.next_timer += 1;
            self.armed.push(self.next_timer);
            self.next_timer
        }

        fn cancel(&mut self, handle: u32) {
            self.armed.retain(|id| *id != handle);
        }
    }

    impl Host for FakeHost {
        fn post(&mut self, message: Outbound) {
            self.posted.push(message);
        }

        fn register_rule(&mut self, domain: &str, rule: Rule) {
            self.rules.push((domain.to_string(), rule));
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }

        fn capture_pointer(&mut self, capture: bool) {
            self.captures.push(capture);
        }
    }

    fn script(html: &str, shallow: &str) -> ContentScript<HtmlDom, FakeHost> {
        let state = EngineState {
            keywords: vec!["spoiler".to_string()],
            selectors: SelectorBundle {
                element_shallow: shallow.to_string(),
                ..SelectorBundle::default()
            },
            placeholder_glyph: "XX".to_string(),
            ..EngineState::default()
        };
        ContentScript::new(HtmlDom::parse(html), state, FakeHost::default(), "example.com")
    }

    fn markers(script: &ContentScript<HtmlDom, FakeHost>) -> usize {
        script
            .engine()
            .dom()
            .query_all_documents(&format!("[{JAIL_ATTRIBUTE}]"))
            .unwrap()
            .len()
    }

    fn append(script: &ContentScript<HtmlDom, FakeHost>, html: &str) {
        let dom = script.engine().dom();
        let body = dom.body().unwrap();
        dom.append_html(&body, html).unwrap();
    }

    #[test]
    fn start_guards_existing_content() {
        let mut script = script("<p>spoiler alert</p>", "p");
        assert_eq!(script.start().unwrap(), 1);
        assert_eq!(markers(&script), 1);
    }

    #[test]
    fn first_batch_guards_then_burst_waits_for_timer() {
        let mut script = script("<main></main>", "p");

        append(&script, "<p>spoiler one</p>");
        script.on_mutations().unwrap();
        assert_eq!(markers(&script), 1);

        append(&script, "<p>spoiler two</p>");
        script.on_mutations().unwrap();
        append(&script, "<p>spoiler three</p>");
        script.on_mutations().unwrap();
        assert_eq!(markers(&script), 1);
        assert_eq!(script.host().armed.len(), 1);

        script.on_timer().unwrap();
        assert_eq!(markers(&script), 3);
        assert!(!script.watcher().is_pending());
    }

    #[test]
    fn disabled_script_ignores_mutations_and_commands() {
        let mut script = script("<p>spoiler</p>", "p");
        script.dispatch(Command::TogglePower(false)).unwrap();

        script.on_mutations().unwrap();
        script.dispatch(Command::HideElementsDeep("p".into())).unwrap();
        script.dispatch(Command::HideWithKeyword(vec!["spoiler".into()])).unwrap();

        assert_eq!(markers(&script), 0);
        assert!(script.host().armed.is_empty());
    }

    #[test]
    fn hide_with_keyword_uses_only_new_keywords() {
        let mut script = script("<p>spoiler</p><p>ending</p>", "p");
        script
            .dispatch(Command::HideWithKeyword(vec!["ending".into()]))
            .unwrap();

        assert_eq!(script.engine().jail().len(), 1);
        let paragraphs = script.engine().dom().query_all_documents("p").unwrap();
        assert_eq!(script.engine().dom().inner_html(&paragraphs[0]), "spoiler");
    }

    #[test]
    fn refresh_keyword_replaces_everything() {
        let mut script = script("<p>spoiler</p><p>ending</p>", "p");
        script.start().unwrap();

        script
            .dispatch(Command::RefreshKeyword(vec!["ending".into()]))
            .unwrap();

        assert_eq!(script.engine().state().keywords, vec!["ending".to_string()]);
        let paragraphs = script.engine().dom().query_all_documents("p").unwrap();
        assert_eq!(script.engine().dom().inner_html(&paragraphs[0]), "spoiler");
        assert_eq!(script.engine().dom().inner_html(&paragraphs[1]), "XX");
    }

    #[test]
    fn refresh_selector_moves_hiding() {
        let mut script = script("<p>spoiler</p><h1>spoiler</h1>", "p");
        script.start().unwrap();

        script
            .dispatch(Command::RefreshSelector(SelectorBundle {
                text: "h1".into(),
                ..SelectorBundle::default()
            }))
            .unwrap();

        let dom = script.engine().dom();
        let p = dom.query_all_documents("p").unwrap().remove(0);
        let h1 = dom.query_all_documents("h1").unwrap().remove(0);
        assert!(dom.attribute(&p, JAIL_ATTRIBUTE).is_none());
        assert!(dom.attribute(&h1, JAIL_ATTRIBUTE).is_some());
        assert_eq!(dom.inner_html(&h1), "XX");
    }

    #[test]
    fn set_state_changes_glyph() {
        let mut script = script("<p>spoiler</p>", "p");
        script
            .dispatch(Command::SetState(StatePatch {
                placeholder_glyph: Some("##".into()),
                ..StatePatch::default()
            }))
            .unwrap();
        script.start().unwrap();

        let p = script.engine().dom().query_all_documents("p").unwrap().remove(0);
        assert_eq!(script.engine().dom().inner_html(&p), "##");
    }

    #[test]
    fn picker_session_registers_and_hides() {
        let mut script = script("<div class=card>spoiler</div><div class=card>spoiler too</div>", "");
        script.dispatch(Command::EnableInteractiveMode).unwrap();
        script.dispatch(Command::EnableInteractiveMode).unwrap();
        assert_eq!(script.host().captures, vec![true]);

        let card = script.engine().dom().query_all_documents("div").unwrap().remove(0);
        script.on_pointer_over(&card);
        assert_eq!(script.host().posted, vec![Outbound::SetSelector("div.card".into())]);

        assert!(script.on_click(&card).unwrap());

        let host = script.host();
        assert_eq!(host.rules, vec![("example.com".to_string(), Rule::picked("div.card"))]);
        assert_eq!(host.captures, vec![true, false]);
        assert_eq!(host.notices.len(), 1);
        assert!(host.notices[0].contains("\ndiv.card\n"));
        assert_eq!(markers(&script), 2);
        assert!(!script.picker().is_active());

        // Session over: further clicks pass through.
        let other = script.engine().dom().query_all_documents("div").unwrap().remove(0);
        assert!(!script.on_click(&other).unwrap());
    }

    #[test]
    fn unparsable_pick_is_not_registered() {
        let mut script = script("<div id='main:content'>spoiler</div>", "");
        script.dispatch(Command::EnableInteractiveMode).unwrap();

        let div = script.engine().dom().query_all_documents("div").unwrap().remove(0);
        assert!(script.on_click(&div).unwrap());

        let host = script.host();
        assert!(host.rules.is_empty());
        assert_eq!(host.captures, vec![true, false]);
        assert_eq!(host.notices.len(), 1);
        assert!(host.notices[0].starts_with("The following selector could not be registered."));
        assert!(host.notices[0].contains("\ndiv#main:content\n"));
        assert_eq!(markers(&script), 0);
        assert!(!script.picker().is_active());
    }

    #[test]
    fn disable_interactive_mode_releases_pointer() {
        let mut script = script("<p>x</p>", "");
        script.dispatch(Command::DisableInteractiveMode).unwrap();
        assert!(script.host().captures.is_empty());

        script.dispatch(Command::EnableInteractiveMode).unwrap();
        let p = script.engine().dom().query_all_documents("p").unwrap().remove(0);
        script.on_pointer_over(&p);
        script.dispatch(Command::DisableInteractiveMode).unwrap();

        assert_eq!(script.host().captures, vec![true, false]);
        assert!(script.engine().dom().class_names(&p).is_empty());
    }
}
