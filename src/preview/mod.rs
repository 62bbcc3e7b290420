// src/preview/mod.rs

//! Live preview: a reverse proxy in front of the local site plus a reload
//! signal for connected browsers.
//!
//! There is exactly one [`PreviewService`] per process. The composer hands
//! the same instance to the `serve` task, to every `reload` task and so to
//! every watch binding.

pub mod hub;
pub mod proxy;

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::ThemeConfig;
use crate::errors::Result;
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

pub use hub::WebSocketHub;

/// Something that can tell browsers to reload.
pub trait ReloadBroadcaster: Send + Sync + Debug {
    /// Send a reload to every connected client; returns how many were
    /// reached.
    fn broadcast(&self) -> usize;
}

/// What a call to [`PreviewService::reload`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A reload went out. `resumed` is set when the service was paused.
    Broadcast { clients: usize, resumed: bool },
    /// Live reload is disabled; the service is now paused and nothing was
    /// sent.
    Paused,
}

/// Live preview state.
#[derive(Debug, Default)]
pub struct PreviewService {
    broadcaster: Mutex<Option<Arc<dyn ReloadBroadcaster>>>,
    paused: AtomicBool,
    started: AtomicBool,
}

impl PreviewService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that reports reloads to `broadcaster` instead of a socket.
    pub fn with_broadcaster(broadcaster: Arc<dyn ReloadBroadcaster>) -> Self {
        Self {
            broadcaster: Mutex::new(Some(broadcaster)),
            ..Self::default()
        }
    }

    /// Start the proxy and the reload hub if live reload is enabled.
    ///
    /// Returns whether the service is running afterwards. Calling it again,
    /// or with live reload disabled, does nothing.
    pub async fn start(&self, config: &ThemeConfig) -> Result<bool> {
        if !config.live_reload.enabled {
            debug!("live reload disabled; not starting preview");
            return Ok(false);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(true);
        }

        let port = config.live_reload.port;
        let result = self.bind(port, &config.live_reload.proxy_url).await;
        if result.is_err() {
            self.started.store(false, Ordering::SeqCst);
        }
        result.map(|_| true)
    }

    async fn bind(&self, port: u16, upstream: &str) -> Result<()> {
        let hub_port = port.checked_add(1).unwrap_or(port);
        let hub = WebSocketHub::bind(hub_port)?;
        let hub_port = hub.port();
        let proxy_port = proxy::spawn_proxy(port, upstream, hub_port).await?;

        {
            let mut slot = self.broadcaster.lock().unwrap_or_else(|e| e.into_inner());
            if slot.is_none() {
                *slot = Some(Arc::new(hub));
            }
        }

        info!(
            url = %format!("http://localhost:{proxy_port}"),
            upstream = %upstream,
            "live preview running"
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            debug!("live preview paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            debug!("live preview resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Reload connected browsers, honouring the current config.
    ///
    /// Enabled: resume if paused, then broadcast. Disabled: pause, so
    /// turning live reload off mid-session silences later reloads without a
    /// restart.
    pub fn reload(&self, config: &ThemeConfig) -> ReloadOutcome {
        if !config.live_reload.enabled {
            self.pause();
            return ReloadOutcome::Paused;
        }

        let resumed = self.is_paused();
        self.resume();

        let broadcaster = self
            .broadcaster
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let clients = broadcaster.map(|b| b.broadcast()).unwrap_or(0);
        debug!(clients, resumed, "reload broadcast");
        ReloadOutcome::Broadcast { clients, resumed }
    }
}

/// Graph task that starts the preview service.
#[derive(Debug, Clone)]
pub struct ServeTask {
    preview: Arc<PreviewService>,
}

impl ServeTask {
    pub const NAME: &'static str = "serve";

    pub fn new(preview: Arc<PreviewService>) -> Self {
        Self { preview }
    }
}

impl Task for ServeTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            self.preview.start(&config).await?;
            Ok(TaskReport::default())
        })
    }
}

/// Graph task that reloads the browser; re-reads the config on every run.
#[derive(Debug, Clone)]
pub struct ReloadTask {
    preview: Arc<PreviewService>,
}

impl ReloadTask {
    pub const NAME: &'static str = "reload";

    pub fn new(preview: Arc<PreviewService>) -> Self {
        Self { preview }
    }
}

impl Task for ReloadTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let outcome = self.preview.reload(&config);
            debug!(task = Self::NAME, outcome = ?outcome, "reload finished");
            // Reached browsers count as written; a paused reload as skipped.
            let report = match outcome {
                ReloadOutcome::Broadcast { clients, .. } => TaskReport {
                    written: clients,
                    ..TaskReport::default()
                },
                ReloadOutcome::Paused => TaskReport {
                    skipped: 1,
                    ..TaskReport::default()
                },
            };
            Ok(report)
        })
    }
}
