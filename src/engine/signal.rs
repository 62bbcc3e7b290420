// src/engine/signal.rs

use tokio::sync::oneshot;
use tracing::{error, warn};

use super::{TaskName, TaskOutcome};

/// Lifecycle of one task invocation.
///
/// `Idle → Running → Completed | Failed`. The two end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Not started (yet, or ever, if an earlier step of a sequence failed).
    Idle,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Move to `next`, or return `None` if the transition is not allowed.
    pub fn advance(self, next: TaskState) -> Option<TaskState> {
        match (self, next) {
            (TaskState::Idle, TaskState::Running)
            | (TaskState::Running, TaskState::Completed)
            | (TaskState::Running, TaskState::Failed) => Some(next),
            _ => None,
        }
    }

    /// [`advance`](Self::advance) for callers that cannot recover from an
    /// illegal transition: it is logged and the task settles on `Failed`.
    pub fn advance_or_fail(self, next: TaskState, task: &str) -> TaskState {
        match self.advance(next) {
            Some(state) => state,
            None => {
                error!(task, from = ?self, to = ?next, "invalid task state transition");
                TaskState::Failed
            }
        }
    }
}

/// Sending half of a task's completion signal.
///
/// `complete` consumes the signal, so it cannot fire twice. Dropping it
/// without completing (an early return, a panic inside the task) reports
/// `Failed`, so the receiver never hangs.
#[derive(Debug)]
pub struct CompletionSignal {
    task: TaskName,
    tx: Option<oneshot::Sender<TaskOutcome>>,
}

/// Receiving half of a [`CompletionSignal`].
#[derive(Debug)]
pub struct CompletionReceiver {
    task: TaskName,
    rx: oneshot::Receiver<TaskOutcome>,
}

impl CompletionSignal {
    pub fn new(task: impl Into<TaskName>) -> (Self, CompletionReceiver) {
        let task = task.into();
        let (tx, rx) = oneshot::channel();
        (
            Self {
                task: task.clone(),
                tx: Some(tx),
            },
            CompletionReceiver { task, rx },
        )
    }

    pub fn complete(mut self, outcome: TaskOutcome) {
        if let Some(tx) = self.tx.take() {
            // The receiver may already be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!(task = %self.task, "task ended without completing; reporting failure");
            let _ = tx.send(TaskOutcome::Failed(format!(
                "task '{}' ended without signalling completion",
                self.task
            )));
        }
    }
}

impl CompletionReceiver {
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Wait for the outcome.
    pub async fn wait(self) -> TaskOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Unreachable in practice: the signal always sends on drop.
            Err(_) => TaskOutcome::Failed(format!("task '{}' lost its completion signal", self.task)),
        }
    }
}
