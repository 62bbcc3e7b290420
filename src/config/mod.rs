// src/config/mod.rs

//! Theme configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load the config and style variables files from disk (`loader.rs`).
//! - Validate slug/name/live-reload invariants (`validate.rs`).
//! - Hand tasks a fresh copy on every run (`provider.rs`).

pub mod loader;
pub mod model;
pub mod provider;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_style_variables};
pub use model::{
    DebugFlags, LiveReload, RawThemeConfig, StyleVariables, ThemeConfig, ToolCommands,
    WatchSettings,
};
pub use provider::{ConfigProvider, FileConfigProvider};
pub use validate::validate_config;
