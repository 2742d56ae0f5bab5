//! Guard engine against a real browser document.
//!
//! Run with `wasm-pack test --headless --chrome crates/eg-wasm`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use eg_core::dom::Dom;
use eg_core::jail::JAIL_ATTRIBUTE;
use eg_core::types::SelectorBundle;
use eg_core::{EngineState, GuardEngine};
use eg_wasm::BrowserDom;

wasm_bindgen_test_configure!(run_in_browser);

fn page(html: &str) -> BrowserDom {
    let document = web_sys::window().unwrap().document().unwrap();
    document.body().unwrap().set_inner_html(html);
    BrowserDom::new(document)
}

fn state(keywords: &[&str]) -> EngineState {
    EngineState {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        placeholder_glyph: "XX".to_string(),
        ..EngineState::default()
    }
}

#[wasm_bindgen_test]
fn hides_and_restores_in_live_document() {
    let dom = page("<ul><li>safe</li><li title='x'>spoiler</li><li><img alt='spoiler'></li></ul>");
    let before = dom.document().body().unwrap().inner_html();
    let mut engine = GuardEngine::new(dom, state(&["spoiler"]));
    let bundle = SelectorBundle {
        element_shallow: "li, img".to_string(),
        ..SelectorBundle::default()
    };

    let keywords = engine.state().keywords.clone();
    let jailed = engine.guard_all(&bundle, &keywords).unwrap();

    assert_eq!(jailed, 2);
    let marked = engine
        .dom()
        .query_all_documents(&format!("[{JAIL_ATTRIBUTE}]"))
        .unwrap();
    assert_eq!(marked.len(), 2);
    assert_eq!(engine.dom().tag_name(&marked[1]), "span");

    engine.release_all().unwrap();
    assert_eq!(engine.dom().document().body().unwrap().inner_html(), before);
}

#[wasm_bindgen_test]
fn inline_hidden_elements_are_left_alone() {
    let dom = page("<p style='visibility: hidden'>spoiler</p>");
    let mut engine = GuardEngine::new(dom, state(&["spoiler"]));
    let bundle = SelectorBundle {
        element_shallow: "p".to_string(),
        ..SelectorBundle::default()
    };
    let keywords = engine.state().keywords.clone();

    assert_eq!(engine.guard_all(&bundle, &keywords).unwrap(), 0);
}

#[wasm_bindgen_test]
fn validates_selectors_for_the_popup() {
    assert_eq!(eg_wasm::validate_selector(" p.note ").unwrap(), "p.note");
    assert_eq!(eg_wasm::validate_selector("li:nth-child(2)").unwrap(), "li:nth-child(2)");
    assert!(eg_wasm::validate_selector("p[").is_err());
    assert!(eg_wasm::validate_selector("   ").is_err());
}
