//! Browser services behind the content script: timers, extension
//! messaging, storage write-through, alerts and pointer capture.

use js_sys::{Function, Promise, Reflect};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{MouseEvent, Node, Window};

use eg_compiler::{add_rule, AuthoringError, StorageArea};
use eg_core::message::Outbound;
use eg_core::types::Rule;
use eg_core::watcher::Scheduler;
use eg_core::Host;

// =============================================================================
// Console Logging
// =============================================================================

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[emoguard] {}", record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` output to the devtools console. Later calls only change the
/// level.
pub fn init_logging(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

// =============================================================================
// chrome.* access
// =============================================================================

/// Walk `chrome.<path>` on the global object.
fn chrome(path: &[&str]) -> Result<JsValue, JsValue> {
    let mut value = Reflect::get(&js_sys::global(), &"chrome".into())?;
    for key in path {
        if value.is_undefined() || value.is_null() {
            return Err(JsValue::from_str(&format!("chrome.{} is unavailable", path.join("."))));
        }
        value = Reflect::get(&value, &(*key).into())?;
    }
    Ok(value)
}

/// Call `chrome.<path>.<method>(arg)` and await the result if it is a promise.
async fn call_chrome(path: &[&str], method: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
    let target = chrome(path)?;
    let function: Function = Reflect::get(&target, &method.into())?.dyn_into()?;
    let result = function.call1(&target, arg)?;
    match result.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// Read the given keys of `chrome.storage.<area>`.
pub async fn read_storage(area: &str, keys: &[&str]) -> Result<StorageArea, JsValue> {
    let keys = to_js(&keys)?;
    let value = call_chrome(&["storage", area], "get", &keys).await?;
    serde_wasm_bindgen::from_value(value).map_err(JsValue::from)
}

/// Append a picked rule to the stored RuleSets in `sync`.
async fn store_rule(domain: String, rule: Rule) -> Result<(), JsValue> {
    let stored = read_storage("sync", &["sites"]).await?;
    let mut sites = stored.sites.unwrap_or_default();
    match add_rule(&mut sites, &domain, rule) {
        Ok(()) => {}
        Err(err @ AuthoringError::Duplicate { .. }) => {
            log::info!("{err}");
            return Ok(());
        }
        Err(err) => return Err(JsValue::from_str(&err.to_string())),
    }

    let update = StorageArea {
        sites: Some(sites),
        ..StorageArea::default()
    };
    call_chrome(&["storage", "sync"], "set", &to_js(&update)?).await?;
    Ok(())
}

/// `chrome.i18n.getMessage(key)`, if the catalogue has it.
fn i18n(key: &str) -> Option<String> {
    let target = chrome(&["i18n"]).ok()?;
    let function: Function = Reflect::get(&target, &"getMessage".into()).ok()?.dyn_into().ok()?;
    function
        .call1(&target, &key.into())
        .ok()?
        .as_string()
        .filter(|message| !message.is_empty())
}

// =============================================================================
// Host
// =============================================================================

const POINTER_EVENTS: [&str; 3] = ["mouseover", "mouseout", "click"];

/// Callbacks the host hands to the browser. Created once and kept for the
/// page's lifetime.
pub struct Callbacks {
    pub timer: Closure<dyn FnMut()>,
    pub pointer_over: Closure<dyn FnMut(MouseEvent)>,
    pub pointer_out: Closure<dyn FnMut(MouseEvent)>,
    pub click: Closure<dyn FnMut(MouseEvent)>,
}

pub struct ChromeHost {
    window: Window,
    callbacks: Callbacks,
}

impl ChromeHost {
    pub fn new(window: Window, callbacks: Callbacks) -> Self {
        Self { window, callbacks }
    }

    fn pointer_callback(&self, event: &str) -> &Function {
        match event {
            "mouseover" => self.callbacks.pointer_over.as_ref().unchecked_ref(),
            "mouseout" => self.callbacks.pointer_out.as_ref().unchecked_ref(),
            _ => self.callbacks.click.as_ref().unchecked_ref(),
        }
    }
}

impl Scheduler for ChromeHost {
    type Handle = Option<i32>;

    fn schedule(&mut self, delay_ms: u32) -> Option<i32> {
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                self.callbacks.timer.as_ref().unchecked_ref(),
                delay,
            )
            .map_err(|err| log::error!("setTimeout failed: {err:?}"))
            .ok()
    }

    fn cancel(&mut self, handle: Option<i32>) {
        if let Some(handle) = handle {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

impl Host for ChromeHost {
    fn post(&mut self, message: Outbound) {
        let envelope = match to_js(&message.to_envelope()) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::warn!("could not encode outbound message: {err:?}");
                return;
            }
        };
        spawn_local(async move {
            // Rejects when no popup is listening.
            if let Err(err) = call_chrome(&["runtime"], "sendMessage", &envelope).await {
                log::debug!("sendMessage: {err:?}");
            }
        });
    }

    fn register_rule(&mut self, domain: &str, rule: Rule) {
        let domain = domain.to_string();
        spawn_local(async move {
            if let Err(err) = store_rule(domain, rule).await {
                log::error!("could not store picked rule: {err:?}");
            }
        });
    }

    fn notify(&mut self, message: &str) {
        if let Err(err) = self.window.alert_with_message(message) {
            log::warn!("alert failed: {err:?}");
        }
    }

    fn capture_pointer(&mut self, capture: bool) {
        let Some(root) = self.window.document().and_then(|doc| doc.document_element()) else {
            return;
        };
        for event in POINTER_EVENTS {
            let callback = self.pointer_callback(event);
            let result = if capture {
                root.add_event_listener_with_callback(event, callback)
            } else {
                root.remove_event_listener_with_callback(event, callback)
            };
            if let Err(err) = result {
                log::warn!("{event} listener: {err:?}");
            }
        }
    }

    fn registration_heading(&self) -> String {
        i18n("selectorRegistrationAlert")
            .unwrap_or_else(|| "The following selector has been registered.".to_string())
    }

    fn rejection_heading(&self) -> String {
        i18n("selectorRejectionAlert")
            .unwrap_or_else(|| "The following selector could not be registered.".to_string())
    }
}

/// Event target as a DOM node.
pub fn event_node(event: &MouseEvent) -> Option<Node> {
    event.target()?.dyn_into::<Node>().ok()
}
