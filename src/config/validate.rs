// src/config/validate.rs

use crate::config::model::RawThemeConfig;
use crate::errors::{Result, RigError};

/// Run semantic validation against a freshly parsed theme configuration.
///
/// This checks:
/// - `theme.slug` is non-empty and only contains `[a-z0-9_-]`
/// - `theme.name` is non-empty, not `.` or `..`, and has no `/`, `\\` or NUL
/// - `dev.live_reload.port` is non-zero
/// - `dev.live_reload.proxy_url` is an http(s) URL
///
/// Downstream tasks rewrite file contents with the slug and name, so there is
/// no fallback: an invalid value is a configuration error.
pub fn validate_config(cfg: &RawThemeConfig) -> Result<()> {
    validate_theme(cfg)?;
    validate_live_reload(cfg)?;
    Ok(())
}

fn validate_theme(cfg: &RawThemeConfig) -> Result<()> {
    let slug = cfg.theme.slug.trim();
    if slug.is_empty() {
        return Err(RigError::ConfigError(
            "[theme].slug must not be empty".to_string(),
        ));
    }

    if let Some(bad) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
    {
        return Err(RigError::ConfigError(format!(
            "[theme].slug '{}' contains invalid character '{}' (allowed: a-z, 0-9, '_', '-')",
            slug, bad
        )));
    }

    let name = cfg.theme.name.trim();
    if name.is_empty() {
        return Err(RigError::ConfigError(
            "[theme].name must not be empty".to_string(),
        ));
    }

    // The name becomes a file name under the export root.
    if name == "." || name == ".." {
        return Err(RigError::ConfigError(format!(
            "[theme].name '{}' is not usable as an export name",
            name
        )));
    }
    if let Some(bad) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(RigError::ConfigError(format!(
            "[theme].name '{}' contains invalid character {:?}",
            name, bad
        )));
    }

    Ok(())
}

fn validate_live_reload(cfg: &RawThemeConfig) -> Result<()> {
    let lr = &cfg.dev.live_reload;

    if lr.port == 0 {
        return Err(RigError::ConfigError(
            "[dev.live_reload].port must be >= 1 (got 0)".to_string(),
        ));
    }

    if !(lr.proxy_url.starts_with("http://") || lr.proxy_url.starts_with("https://")) {
        return Err(RigError::ConfigError(format!(
            "[dev.live_reload].proxy_url must be an http(s) URL (got '{}')",
            lr.proxy_url
        )));
    }

    Ok(())
}
