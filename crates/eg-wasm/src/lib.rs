//! WebAssembly content script for EmoGuard

mod dom;
mod host;

use std::cell::RefCell;

use js_sys::{Array, Function, Reflect};
use log::LevelFilter;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MouseEvent, MutationObserver, MutationObserverInit};

use eg_compiler::{compile_for_domain, validate_pattern_with, Settings};
use eg_core::message::{Command, Envelope, MessageError};
use eg_core::picker::HIGHLIGHT_CLASS;
use eg_core::types::Site;
use eg_core::url::frame_domain;
use eg_core::ContentScript;

pub use dom::BrowserDom;
pub use host::ChromeHost;

use host::{event_node, init_logging, read_storage, to_js, Callbacks};

type Script = ContentScript<BrowserDom, ChromeHost>;

thread_local! {
    static SCRIPT: RefCell<Option<Script>> = const { RefCell::new(None) };
}

/// Run `f` against the page's content script. Returns `None` before start or
/// when a callback fires while another one is still running.
fn with_script<R>(f: impl FnOnce(&mut Script) -> R) -> Option<R> {
    SCRIPT.with(|cell| {
        let Ok(mut guard) = cell.try_borrow_mut() else {
            log::warn!("content script busy, event dropped");
            return None;
        };
        guard.as_mut().map(f)
    })
}

// =============================================================================
// Entry Points
// =============================================================================

/// Content-script entry point: load settings, sweep the page, then start
/// watching mutations and listening for commands.
#[wasm_bindgen]
pub async fn start() -> Result<(), JsValue> {
    init_logging(LevelFilter::Info);

    if SCRIPT.with(|cell| cell.borrow().is_some()) {
        return Err(JsValue::from_str("Already started. Reload the page to restart."));
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let location = window.location();

    let Some(domain) = frame_domain(&ancestor_origins(&location), &location.hostname()?) else {
        log::debug!("outermost origin is not http(s); not guarding this frame");
        return Ok(());
    };

    let sync = read_storage("sync", &["keywords", "sites", "emoGuardian"]).await?;
    let local = read_storage(
        "local",
        &["keywords", "sites", "emoGuardian", "autoImportEnabled", "blockingSpeed"],
    )
    .await?;
    let state = Settings::resolve(&sync, &local).engine_state(&domain);

    let host = ChromeHost::new(window, callbacks());
    let mut script = ContentScript::new(BrowserDom::new(document.clone()), state, host, domain);
    if let Err(err) = script.start() {
        log::error!("initial guard pass failed: {err}");
    }
    SCRIPT.with(|cell| *cell.borrow_mut() = Some(script));

    inject_highlight_style(&document)?;
    observe_mutations(&document)?;
    listen_for_commands()?;
    Ok(())
}

#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from_str(&format!("unknown log level: {level}")))?;
    init_logging(level);
    Ok(())
}

/// Effective selectors for `domain`; used by the popup preview.
#[wasm_bindgen]
pub fn compile_selectors(sites: JsValue, domain: &str) -> Result<JsValue, JsValue> {
    let sites: Vec<Site> = serde_wasm_bindgen::from_value(sites)?;
    to_js(&compile_for_domain(&sites, domain))
}

/// Normalized selector, or an error message for the authoring form. The
/// browser's own parser decides, through a query on a detached fragment.
#[wasm_bindgen]
pub fn validate_selector(pattern: &str) -> Result<String, JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let fragment = document.create_document_fragment();
    validate_pattern_with(pattern, |pattern| {
        fragment
            .query_selector(pattern)
            .map(drop)
            .map_err(|err| match err.dyn_ref::<js_sys::Error>() {
                Some(error) => String::from(error.message()),
                None => format!("{err:?}"),
            })
    })
    .map_err(|err| JsValue::from_str(&err.to_string()))
}

// =============================================================================
// Browser Wiring
// =============================================================================

/// `location.ancestorOrigins`, nearest first. Absent outside Chromium.
fn ancestor_origins(location: &web_sys::Location) -> Vec<String> {
    let Ok(list) = Reflect::get(location, &"ancestorOrigins".into()) else {
        return Vec::new();
    };
    if list.is_undefined() || list.is_null() {
        return Vec::new();
    }
    let length = Reflect::get(&list, &"length".into())
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0) as u32;
    (0..length)
        .filter_map(|i| Reflect::get_u32(&list, i).ok())
        .filter_map(|origin| origin.as_string())
        .collect()
}

fn callbacks() -> Callbacks {
    Callbacks {
        timer: Closure::new(|| {
            if let Some(Err(err)) = with_script(|script| script.on_timer()) {
                log::error!("debounced guard pass failed: {err}");
            }
        }),
        pointer_over: Closure::new(|event: MouseEvent| {
            if let Some(node) = event_node(&event) {
                with_script(|script| script.on_pointer_over(&node));
            }
        }),
        pointer_out: Closure::new(|event: MouseEvent| {
            if let Some(node) = event_node(&event) {
                with_script(|script| script.on_pointer_out(&node));
            }
        }),
        click: Closure::new(|event: MouseEvent| {
            let Some(node) = event_node(&event) else {
                return;
            };
            event.prevent_default();
            event.stop_propagation();
            match with_script(|script| script.on_click(&node)) {
                Some(Err(err)) => log::error!("guarding picked selector failed: {err}"),
                Some(Ok(_)) | None => {}
            }
        }),
    }
}

fn inject_highlight_style(document: &web_sys::Document) -> Result<(), JsValue> {
    let Some(root) = document.document_element() else {
        return Ok(());
    };
    let style = document.create_element("style")?;
    style.set_text_content(Some(&format!(
        ".{HIGHLIGHT_CLASS} {{ outline: 2px solid #e53935 !important; cursor: crosshair !important; }}"
    )));
    root.append_child(&style)?;
    Ok(())
}

fn observe_mutations(document: &web_sys::Document) -> Result<(), JsValue> {
    let root = document
        .document_element()
        .ok_or_else(|| JsValue::from_str("no document element"))?;

    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(|_records: Array, _observer: MutationObserver| {
        if let Some(Err(err)) = with_script(|script| script.on_mutations()) {
            log::error!("mutation guard pass failed: {err}");
        }
    });
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&root, &options)?;

    // Both live for the page's lifetime.
    callback.forget();
    std::mem::forget(observer);
    Ok(())
}

fn listen_for_commands() -> Result<(), JsValue> {
    let callback = Closure::<dyn FnMut(JsValue, JsValue, Function) -> JsValue>::new(
        |message: JsValue, _sender: JsValue, send_response: Function| -> JsValue {
            handle_message(message);
            let _ = send_response.call0(&JsValue::UNDEFINED);
            JsValue::FALSE
        },
    );

    let on_message = Reflect::get(&Reflect::get(&js_sys::global(), &"chrome".into())?, &"runtime".into())
        .and_then(|runtime| Reflect::get(&runtime, &"onMessage".into()))?;
    let add_listener: Function = Reflect::get(&on_message, &"addListener".into())?.dyn_into()?;
    add_listener.call1(&on_message, callback.as_ref())?;

    callback.forget();
    Ok(())
}

fn handle_message(message: JsValue) {
    let envelope = match serde_wasm_bindgen::from_value::<Envelope>(message) {
        Ok(envelope) => envelope,
        Err(err) => {
            log::debug!("ignoring non-command message: {err}");
            return;
        }
    };
    let command = match Command::from_envelope(envelope) {
        Ok(command) => command,
        // Messages for other contexts share the channel.
        Err(MessageError::UnknownCommand(name)) => {
            log::debug!("ignoring message {name}");
            return;
        }
        Err(err) => {
            log::warn!("dropping command: {err}");
            return;
        }
    };

    let name = command.name();
    if let Some(Err(err)) = with_script(|script| script.dispatch(command)) {
        log::error!("{name} failed: {err}");
    }
}
