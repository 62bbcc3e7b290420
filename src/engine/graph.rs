// src/engine/graph.rs

use std::fmt;
use std::sync::Arc;

use crate::tasks::Task;

/// Composition of tasks.
///
/// Graphs are built once from static task references, so they are acyclic
/// by construction.
#[derive(Clone)]
pub enum TaskGraph {
    Task(Arc<dyn Task>),
    /// Strict order; stops at the first failure.
    Sequence(Vec<TaskGraph>),
    /// All children start together; completes when all of them have.
    Parallel(Vec<TaskGraph>),
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskGraph::Task(t) => write!(f, "Task({})", t.name()),
            TaskGraph::Sequence(c) => f.debug_tuple("Sequence").field(c).finish(),
            TaskGraph::Parallel(c) => f.debug_tuple("Parallel").field(c).finish(),
        }
    }
}

impl TaskGraph {
    pub fn task(task: impl Task + 'static) -> Self {
        TaskGraph::Task(Arc::new(task))
    }

    pub fn shared(task: Arc<dyn Task>) -> Self {
        TaskGraph::Task(task)
    }

    pub fn sequence(children: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Sequence(children.into_iter().collect())
    }

    pub fn parallel(children: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Parallel(children.into_iter().collect())
    }

    /// Task names in depth-first order.
    pub fn task_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        match self {
            TaskGraph::Task(t) => out.push(t.name().to_string()),
            TaskGraph::Sequence(c) | TaskGraph::Parallel(c) => {
                for child in c {
                    child.collect_names(out);
                }
            }
        }
    }

    /// Render the graph as an indented tree.
    ///
    /// ```text
    /// sequence
    ///   php
    ///   parallel
    ///     scripts
    ///     jsMin
    /// ```
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(0, &mut out);
        out
    }

    fn describe_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self {
            TaskGraph::Task(t) => {
                out.push_str(&indent);
                out.push_str(t.name());
                out.push('\n');
            }
            TaskGraph::Sequence(c) | TaskGraph::Parallel(c) => {
                out.push_str(&indent);
                out.push_str(if matches!(self, TaskGraph::Sequence(_)) {
                    "sequence"
                } else {
                    "parallel"
                });
                out.push('\n');
                for child in c {
                    child.describe_into(depth + 1, out);
                }
            }
        }
    }
}
