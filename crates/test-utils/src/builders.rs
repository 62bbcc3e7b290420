#![allow(dead_code)]

use rigbuild::config::{DebugFlags, LiveReload, ThemeConfig, ToolCommands, WatchSettings};
use rigbuild::types::TriggerWhileRunningBehaviour;

/// Builder for `ThemeConfig` to simplify test setup.
///
/// Defaults match a freshly generated theme: placeholder slug/name, live
/// reload off, no browser targets, hashing on, queue mode.
#[derive(Debug, Clone)]
pub struct ThemeConfigBuilder {
    config: ThemeConfig,
}

impl ThemeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig {
                slug: "wprig".to_string(),
                name: "WP Rig".to_string(),
                author: "The WP Rig Contributors".to_string(),
                debug: DebugFlags::default(),
                export_compress: false,
                live_reload: LiveReload {
                    enabled: false,
                    proxy_url: "http://localhost:8888".to_string(),
                    port: 8181,
                },
                browser_targets: vec![],
                watch: WatchSettings {
                    debounce_ms: 20,
                    triggered_while_running: TriggerWhileRunningBehaviour::Queue,
                    use_hash: true,
                },
                tools: ToolCommands::default(),
            },
        }
    }

    pub fn slug(mut self, slug: &str) -> Self {
        self.config.slug = slug.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.config.author = author.to_string();
        self
    }

    pub fn debug_styles(mut self, val: bool) -> Self {
        self.config.debug.styles = val;
        self
    }

    pub fn debug_scripts(mut self, val: bool) -> Self {
        self.config.debug.scripts = val;
        self
    }

    pub fn compress(mut self, val: bool) -> Self {
        self.config.export_compress = val;
        self
    }

    pub fn live_reload(mut self, val: bool) -> Self {
        self.config.live_reload.enabled = val;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.live_reload.port = port;
        self
    }

    pub fn browser_target(mut self, target: &str) -> Self {
        self.config.browser_targets.push(target.to_string());
        self
    }

    pub fn trigger_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running = behaviour;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn script_transpile(mut self, cmd: &str) -> Self {
        self.config.tools.script_transpile = Some(cmd.to_string());
        self
    }

    pub fn build(self) -> ThemeConfig {
        self.config
    }

    /// Render as a `theme.toml` that loads back into the same config.
    pub fn to_toml(&self) -> String {
        let c = &self.config;
        let behaviour = match c.watch.triggered_while_running {
            TriggerWhileRunningBehaviour::Queue => "queue",
            TriggerWhileRunningBehaviour::Concurrent => "concurrent",
        };
        let targets: Vec<String> = c
            .browser_targets
            .iter()
            .map(|t| format!("{t:?}"))
            .collect();

        let mut out = format!(
            r#"[theme]
slug = {slug:?}
name = {name:?}
author = {author:?}

[dev]
browserslist = [{targets}]

[dev.debug]
styles = {styles}
scripts = {scripts}

[dev.live_reload]
live = {live}
proxy_url = {proxy:?}
port = {port}

[dev.watch]
debounce_ms = {debounce}
triggered_while_running = "{behaviour}"
use_hash = {use_hash}

[export]
compress = {compress}
"#,
            slug = c.slug,
            name = c.name,
            author = c.author,
            targets = targets.join(", "),
            styles = c.debug.styles,
            scripts = c.debug.scripts,
            live = c.live_reload.enabled,
            proxy = c.live_reload.proxy_url,
            port = c.live_reload.port,
            debounce = c.watch.debounce_ms,
            use_hash = c.watch.use_hash,
            compress = c.export_compress,
        );

        if let Some(cmd) = &c.tools.script_transpile {
            out.push_str(&format!("\n[tools]\nscript_transpile = {cmd:?}\n"));
        }
        out
    }
}

impl Default for ThemeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
