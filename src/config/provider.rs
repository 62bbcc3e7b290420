// src/config/provider.rs

//! Injected access to the theme configuration.
//!
//! Every task asks its provider for a configuration at the start of each run.
//! Implementations must not memoize: edits made between runs have to be
//! visible to the next run without restarting the process.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::loader::{load_and_validate, load_style_variables};
use crate::config::model::{StyleVariables, ThemeConfig};
use crate::errors::Result;

/// Source of theme configuration with an "always fresh" contract.
pub trait ConfigProvider: Send + Sync + Debug {
    /// Load and validate the theme configuration.
    fn load(&self) -> Result<ThemeConfig>;

    /// Load the custom property / custom media definitions.
    fn load_style_variables(&self) -> Result<StyleVariables>;
}

/// Provider that re-reads both files from disk on every call.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    theme_config: PathBuf,
    style_variables: PathBuf,
}

impl FileConfigProvider {
    pub fn new(theme_config: impl Into<PathBuf>, style_variables: impl Into<PathBuf>) -> Self {
        Self {
            theme_config: theme_config.into(),
            style_variables: style_variables.into(),
        }
    }

    pub fn theme_config_path(&self) -> &Path {
        &self.theme_config
    }

    pub fn style_variables_path(&self) -> &Path {
        &self.style_variables
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> Result<ThemeConfig> {
        debug!(path = ?self.theme_config, "reading theme config");
        load_and_validate(&self.theme_config)
    }

    fn load_style_variables(&self) -> Result<StyleVariables> {
        debug!(path = ?self.style_variables, "reading style variables");
        load_style_variables(&self.style_variables)
    }
}
