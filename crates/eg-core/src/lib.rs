//! EmoGuard Core Library
//!
//! This crate provides the guarding engine injected into every page by the
//! EmoGuard extension. It finds elements containing blocked keywords, swaps
//! them for placeholders, and keeps the originals so they can be restored.
//!
//! # Architecture
//!
//! The engine is written against the [`Dom`] trait. The browser build
//! implements it over `web-sys`; the `html` feature supplies an in-memory
//! document for offline use and tests. Timers, messaging and persistence
//! are reached through the [`Host`] trait.
//!
//! # Modules
//!
//! - `types`: Rules, RuleSets and the effective selector bundle
//! - `state`: Live engine state and `setState` patches
//! - `dom`: Document abstraction
//! - `keyword`: Keyword Matcher
//! - `redact`: Case-insensitive keyword redaction for text-hide
//! - `jail`: Jail Registry
//! - `engine`: Guard Engine
//! - `watcher`: Debounced mutation handling
//! - `picker`: Interactive selector picker
//! - `message`: Command envelope
//! - `script`: Per-frame orchestrator
//! - `url`: Frame host resolution

pub mod dom;
pub mod engine;
pub mod jail;
pub mod keyword;
pub mod message;
pub mod picker;
pub mod redact;
pub mod script;
pub mod state;
pub mod types;
pub mod url;
pub mod watcher;

#[cfg(feature = "html")]
pub mod html;

// Re-export commonly used types
pub use dom::{Dom, DomError};
pub use engine::{GuardEngine, GuardError};
pub use jail::{JailRegistry, JAIL_ATTRIBUTE};
pub use message::{Command, Envelope, MessageError, Outbound};
pub use script::{ContentScript, Host};
pub use state::{EngineState, StatePatch};
pub use types::{HideMode, Rule, SearchMode, SelectorBundle, Site, ALL_SITES};
pub use watcher::{MutationWatcher, Scheduler, WatchOutcome};

#[cfg(feature = "html")]
pub use html::{parse_selector, HtmlDom};
