// src/tasks/mod.rs

//! Leaf transform tasks.
//!
//! Each task loads a fresh configuration from its [`TaskContext`] at the
//! start of every run, builds a [`Pipeline`](crate::pipeline::Pipeline)
//! from it and runs it over its source set. Per-file failures are counted in
//! the [`TaskReport`]; only fatal conditions (bad config, unreadable source
//! root, unwritable destination root) make `run` return `Err`.

pub mod copy;
pub mod css;
pub mod images;
pub mod lint;
pub mod package;
pub mod php;
pub mod sass;
pub mod scripts;
pub mod styles;
pub mod translate;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ConfigProvider;
use crate::errors::Result;
use crate::paths::PathSet;
use crate::pipeline::{PipelineReport, WriteClaims};

pub use copy::CopyTask;
pub use images::ImageTask;
pub use package::PackageTask;
pub use php::PhpTask;
pub use sass::SassTask;
pub use scripts::ScriptTask;
pub use styles::StyleTask;
pub use translate::TranslateTask;

/// Everything a task needs for one run.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<dyn ConfigProvider>,
    pub paths: Arc<PathSet>,
    /// Destination registry shared by every task of the current graph run.
    pub claims: WriteClaims,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("config", &self.config)
            .field("root", &self.paths.root)
            .field("claims", &self.claims.len())
            .finish()
    }
}

impl TaskContext {
    pub fn new(config: Arc<dyn ConfigProvider>, paths: Arc<PathSet>) -> Self {
        Self {
            config,
            paths,
            claims: WriteClaims::new(),
        }
    }

    /// Same providers, fresh claims registry. Used at the start of every
    /// graph run.
    pub fn for_new_run(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            paths: Arc::clone(&self.paths),
            claims: WriteClaims::new(),
        }
    }
}

/// File counts for one task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Source files matched.
    pub files: usize,
    /// Files that made it through every stage.
    pub written: usize,
    /// Files deliberately skipped, e.g. already up to date.
    pub skipped: usize,
    /// Files that failed and were skipped.
    pub errors: usize,
}

impl TaskReport {
    pub fn merge(&mut self, other: &TaskReport) {
        self.files += other.files;
        self.written += other.written;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl From<&PipelineReport> for TaskReport {
    fn from(r: &PipelineReport) -> Self {
        Self {
            files: r.matched,
            written: r.emitted,
            skipped: r.dropped,
            errors: r.errors,
        }
    }
}

impl From<PipelineReport> for TaskReport {
    fn from(r: PipelineReport) -> Self {
        Self::from(&r)
    }
}

/// Future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

/// A named unit of work in a task graph.
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a>;
}
