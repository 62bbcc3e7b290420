// src/engine/runner.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::tasks::{Task, TaskContext, TaskReport};

use super::graph::TaskGraph;
use super::signal::{CompletionSignal, TaskState};
use super::{TaskName, TaskOutcome};

/// What happened to one task during a graph run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub name: TaskName,
    /// `Idle` means the task never started.
    pub state: TaskState,
    pub report: Option<TaskReport>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl TaskRecord {
    fn not_run(name: TaskName) -> Self {
        Self {
            name,
            state: TaskState::Idle,
            report: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// Result of running a whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphOutcome {
    /// One record per task, in the order the tasks finished (not-run tasks
    /// last within their sequence).
    pub records: Vec<TaskRecord>,
}

impl GraphOutcome {
    /// True when every task reached `Completed`.
    pub fn succeeded(&self) -> bool {
        self.records.iter().all(|r| r.state == TaskState::Completed)
    }

    pub fn failed_tasks(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.state == TaskState::Failed)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn record(&self, name: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.record(name).map(|r| r.state)
    }
}

type NodeFuture = Pin<Box<dyn Future<Output = (bool, Vec<TaskRecord>)> + Send>>;

/// Executes task graphs against a shared context.
#[derive(Debug, Clone)]
pub struct GraphRunner {
    ctx: TaskContext,
}

impl GraphRunner {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Run `graph` to completion. Every run gets its own write-claims
    /// registry.
    pub async fn run(&self, graph: &TaskGraph) -> GraphOutcome {
        let ctx = self.ctx.for_new_run();
        let (_, records) = run_node(ctx, graph.clone()).await;
        let outcome = GraphOutcome { records };

        if outcome.succeeded() {
            info!(tasks = outcome.records.len(), "graph run completed");
        } else {
            error!(failed = ?outcome.failed_tasks(), "graph run failed");
        }
        outcome
    }

    /// Run a single task outside any graph.
    pub async fn run_task(&self, task: Arc<dyn Task>) -> TaskRecord {
        run_one(self.ctx.for_new_run(), task).await
    }
}

fn run_node(ctx: TaskContext, graph: TaskGraph) -> NodeFuture {
    Box::pin(async move {
        match graph {
            TaskGraph::Task(task) => {
                let record = run_one(ctx, task).await;
                (record.state == TaskState::Completed, vec![record])
            }
            TaskGraph::Sequence(children) => {
                let mut records = Vec::new();
                let mut children = children.into_iter();
                let mut ok = true;
                for child in children.by_ref() {
                    let (child_ok, child_records) = run_node(ctx.clone(), child).await;
                    records.extend(child_records);
                    if !child_ok {
                        ok = false;
                        break;
                    }
                }
                for skipped in children {
                    records.extend(skipped.task_names().into_iter().map(TaskRecord::not_run));
                }
                (ok, records)
            }
            TaskGraph::Parallel(children) => {
                let mut set = JoinSet::new();
                for (idx, child) in children.into_iter().enumerate() {
                    let ctx = ctx.clone();
                    set.spawn(async move { (idx, run_node(ctx, child).await) });
                }

                // Keep sibling order stable in the outcome.
                let mut results = Vec::new();
                let mut ok = true;
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok((idx, (child_ok, child_records))) => {
                            ok &= child_ok;
                            results.push((idx, child_records));
                        }
                        Err(err) => {
                            error!(error = %err, "parallel branch panicked");
                            ok = false;
                        }
                    }
                }
                results.sort_by_key(|(idx, _)| *idx);
                (ok, results.into_iter().flat_map(|(_, r)| r).collect())
            }
        }
    })
}

async fn run_one(ctx: TaskContext, task: Arc<dyn Task>) -> TaskRecord {
    let name = task.name().to_string();
    let (signal, done) = CompletionSignal::new(name.clone());

    let state = TaskState::Idle.advance_or_fail(TaskState::Running, &name);
    info!(task = %name, "starting task");
    let started = Instant::now();

    let handle = tokio::spawn(async move {
        let outcome = match task.run(&ctx).await {
            Ok(report) => TaskOutcome::Completed(report),
            Err(err) => TaskOutcome::Failed(err.to_string()),
        };
        signal.complete(outcome);
    });

    let outcome = done.wait().await;
    // The task body has already signalled; a join error here is a panic
    // after completion and changes nothing.
    let _ = handle.await;
    let elapsed = started.elapsed();

    match outcome {
        TaskOutcome::Completed(report) => {
            info!(
                task = %name,
                files = report.files,
                written = report.written,
                skipped = report.skipped,
                errors = report.errors,
                elapsed_ms = elapsed.as_millis() as u64,
                "task completed"
            );
            TaskRecord {
                name: name.clone(),
                state: state.advance_or_fail(TaskState::Completed, &name),
                report: Some(report),
                error: None,
                elapsed,
            }
        }
        TaskOutcome::Failed(message) => {
            error!(task = %name, error = %message, "task failed");
            TaskRecord {
                name: name.clone(),
                state: state.advance_or_fail(TaskState::Failed, &name),
                report: None,
                error: Some(message),
                elapsed,
            }
        }
    }
}
