// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::validate::validate_config;
use crate::errors::RigError;
use crate::types::TriggerWhileRunningBehaviour;

/// Theme configuration exactly as read from `theme.toml`.
///
/// ```toml
/// [theme]
/// slug = "wprig"
/// name = "WP Rig"
/// author = "The WP Rig Contributors"
///
/// [dev.debug]
/// styles = false
///
/// [dev.live_reload]
/// live = true
/// proxy_url = "http://localhost:8888"
/// port = 8181
///
/// [export]
/// compress = true
/// ```
///
/// `[theme]` is mandatory; everything else has defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawThemeConfig {
    pub theme: ThemeSection,

    #[serde(default)]
    pub dev: DevSection,

    #[serde(default)]
    pub export: ExportSection,

    #[serde(default)]
    pub tools: ToolCommands,
}

/// `[theme]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeSection {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub author: String,
}

/// `[dev]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DevSection {
    /// Browser compatibility targets. An empty list disables vendor
    /// prefixing.
    #[serde(default)]
    pub browserslist: Vec<String>,

    #[serde(default)]
    pub debug: DebugFlags,

    #[serde(default)]
    pub live_reload: LiveReloadSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[dev.debug]`: suppress minification per asset kind.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct DebugFlags {
    #[serde(default)]
    pub styles: bool,
    #[serde(default)]
    pub scripts: bool,
}

/// `[dev.live_reload]`.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadSection {
    #[serde(default)]
    pub live: bool,

    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_proxy_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_port() -> u16 {
    8181
}

impl Default for LiveReloadSection {
    fn default() -> Self {
        Self {
            live: false,
            proxy_url: default_proxy_url(),
            port: default_port(),
        }
    }
}

/// `[dev.watch]`: how the watch dispatcher treats bursts of events.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub triggered_while_running: TriggerWhileRunningBehaviour,

    #[serde(default = "default_use_hash")]
    pub use_hash: bool,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_use_hash() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            triggered_while_running: TriggerWhileRunningBehaviour::default(),
            use_hash: default_use_hash(),
        }
    }
}

/// `[export]`.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ExportSection {
    #[serde(default)]
    pub compress: bool,
}

/// `[tools]`: optional external processors. Each command receives the file
/// contents on stdin; `{file}` is replaced with the source path.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ToolCommands {
    #[serde(default)]
    pub php_lint: Option<String>,
    #[serde(default)]
    pub script_lint: Option<String>,
    #[serde(default)]
    pub script_transpile: Option<String>,
}

/// Live preview settings after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReload {
    pub enabled: bool,
    pub proxy_url: String,
    pub port: u16,
}

/// Watch dispatcher settings after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub debounce_ms: u64,
    pub triggered_while_running: TriggerWhileRunningBehaviour,
    pub use_hash: bool,
}

/// Validated theme configuration.
///
/// Always obtained fresh through a [`ConfigProvider`](crate::config::ConfigProvider);
/// nothing in the build keeps one of these across a task boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub slug: String,
    pub name: String,
    pub author: String,
    pub debug: DebugFlags,
    pub export_compress: bool,
    pub live_reload: LiveReload,
    pub browser_targets: Vec<String>,
    pub watch: WatchSettings,
    pub tools: ToolCommands,
}

impl TryFrom<RawThemeConfig> for ThemeConfig {
    type Error = RigError;

    fn try_from(raw: RawThemeConfig) -> Result<Self, Self::Error> {
        validate_config(&raw)?;

        Ok(Self {
            slug: raw.theme.slug,
            name: raw.theme.name,
            author: raw.theme.author,
            debug: raw.dev.debug,
            export_compress: raw.export.compress,
            live_reload: LiveReload {
                enabled: raw.dev.live_reload.live,
                proxy_url: raw.dev.live_reload.proxy_url,
                port: raw.dev.live_reload.port,
            },
            browser_targets: raw.dev.browserslist,
            watch: WatchSettings {
                debounce_ms: raw.dev.watch.debounce_ms,
                triggered_while_running: raw.dev.watch.triggered_while_running,
                use_hash: raw.dev.watch.use_hash,
            },
            tools: raw.tools,
        })
    }
}

/// Custom property and custom media definitions used by the style task.
///
/// ```toml
/// [variables]
/// "--global-font-color" = "#333"
///
/// [queries]
/// "--narrow-menu-query" = "screen and (max-width: 37.5em)"
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct StyleVariables {
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}
