//! EmoGuard Configuration Compiler
//!
//! This crate turns the stored RuleSets and settings into the inputs the
//! guard engine runs with, and validates rules before they are stored.

pub mod authoring;
pub mod selector;
pub mod settings;

pub use authoring::{add_rule, remove_empty_sites, validate_pattern, validate_pattern_with, AuthoringError};
pub use selector::{compile, compile_for_domain};
pub use settings::{recommended_rules, ConfigError, Settings, StorageArea};
