// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Compiling source glob patterns per watch binding.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing, so saving a file without changing it runs nothing.
//! - Debouncing events and running the graph bound to each changed path.

pub mod dispatcher;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::engine::{GraphRunner, TaskGraph};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

pub use dispatcher::{DispatchStats, Dispatcher};
pub use hash::{ContentHashes, compute_file_hash};
pub use patterns::{PatternSet, collect_matching_files};
pub use watcher::{WatcherHandle, spawn_watcher};

/// A glob over source files and the graph to run when one of them changes.
#[derive(Clone)]
pub struct WatchBinding {
    pub name: String,
    /// Directory walked when seeding content hashes.
    pub base: PathBuf,
    pub patterns: PatternSet,
    pub graph: TaskGraph,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("patterns", &self.patterns.patterns())
            .field("tasks", &self.graph.task_names())
            .finish()
    }
}

impl WatchBinding {
    pub fn new(
        name: impl Into<String>,
        base: impl Into<PathBuf>,
        patterns: PatternSet,
        graph: TaskGraph,
    ) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            patterns,
            graph,
        }
    }
}

/// Graph task that watches the source tree until Ctrl-C.
#[derive(Debug, Clone)]
pub struct WatchTask {
    bindings: Vec<WatchBinding>,
}

impl WatchTask {
    pub const NAME: &'static str = "watch";

    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }
}

impl Task for WatchTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let root = ctx.paths.root.clone();

            let (_handle, events) = spawn_watcher(&root)?;
            let mut dispatcher = Dispatcher::new(
                &root,
                self.bindings.clone(),
                GraphRunner::new(ctx.clone()),
                &config.watch,
            );
            dispatcher.seed_hashes();

            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %err, "failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            };
            let stats = dispatcher.run_until(events, shutdown).await;
            info!(runs = stats.started, failed = stats.failed, "watch finished");

            Ok(TaskReport::default())
        })
    }
}
