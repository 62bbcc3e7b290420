// src/engine/mod.rs

//! Orchestration engine for rigbuild.
//!
//! This module ties together:
//! - task graphs built from `Sequence` / `Parallel` combinators
//! - the graph runner and its per-task completion signals
//! - the per-binding queue used by the watch dispatcher
//! - the composer that wires the named graphs (first run, distribution,
//!   single tasks) and the watch bindings

use crate::tasks::TaskReport;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Final outcome of one task invocation, delivered through its
/// [`CompletionSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(TaskReport),
    Failed(String),
}

pub mod composer;
pub mod graph;
pub mod queue;
pub mod runner;
pub mod signal;

pub use composer::{Composer, TaskTarget};
pub use graph::TaskGraph;
pub use queue::{BindingQueue, TriggerDecision};
pub use runner::{GraphOutcome, GraphRunner, TaskRecord};
pub use signal::{CompletionReceiver, CompletionSignal, TaskState};
