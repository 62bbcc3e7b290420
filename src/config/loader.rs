// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawThemeConfig, StyleVariables, ThemeConfig};
use crate::errors::{Result, RigError};

/// Load a theme configuration file and return the raw `RawThemeConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawThemeConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        RigError::ConfigError(format!("reading theme config at {:?}: {}", path, e))
    })?;

    let config: RawThemeConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a theme configuration file and validate it.
///
/// This is the entry point the rest of the build uses (through
/// [`FileConfigProvider`](crate::config::FileConfigProvider)). A missing or
/// malformed file is a fatal configuration error.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ThemeConfig> {
    let raw_config = load_from_path(&path)?;
    ThemeConfig::try_from(raw_config)
}

/// Load the style variables file.
///
/// A missing file means "no variables"; a file that exists but does not
/// parse is a configuration error.
pub fn load_style_variables(path: impl AsRef<Path>) -> Result<StyleVariables> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(StyleVariables::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RigError::ConfigError(format!("reading style variables at {:?}: {}", path, e))
    })?;

    let vars: StyleVariables = toml::from_str(&contents)?;
    Ok(vars)
}
