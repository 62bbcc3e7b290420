// src/errors.rs

//! Crate-wide error type.
//!
//! Fatal conditions (configuration, unreadable source roots, unwritable
//! destination roots, preview bind failures) surface as [`RigError`].
//! Per-file transform problems are plain `anyhow` errors that the pipeline
//! logs and recovers from; they never reach this type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cannot read source root {path:?}: {source}")]
    SourceRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write destination root {path:?}: {source}")]
    DestinationRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Live preview could not bind port {port}: {source}")]
    PreviewBind { port: u16, source: std::io::Error },

    #[error("Destination {path:?} was already written by task '{owner}' in this run")]
    PathConflict { path: PathBuf, owner: String },

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Glob error: {0}")]
    GlobError(#[from] globset::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RigError>;
