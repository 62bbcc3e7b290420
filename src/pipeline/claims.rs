// src/pipeline/claims.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::engine::TaskName;
use crate::errors::{Result, RigError};

/// Registry of destination files written during one graph run.
///
/// Tasks in the same graph must write disjoint files. Sibling tasks in a
/// `Parallel` group have no ordering between them, so two of them writing
/// the same file would race; the registry turns that into an explicit
/// per-file error for whichever task claims second.
#[derive(Debug, Clone, Default)]
pub struct WriteClaims {
    owners: Arc<Mutex<HashMap<PathBuf, TaskName>>>,
}

impl WriteClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` for `task`. Claiming a path the same task already owns
    /// is allowed (e.g. a file processed twice by one task).
    pub fn claim(&self, path: &Path, task: &str) -> Result<()> {
        let mut owners = self.owners.lock().unwrap_or_else(|e| e.into_inner());
        match owners.get(path) {
            Some(owner) if owner != task => Err(RigError::PathConflict {
                path: path.to_path_buf(),
                owner: owner.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                debug!(task = %task, path = ?path, "claimed destination");
                owners.insert(path.to_path_buf(), task.to_string());
                Ok(())
            }
        }
    }

    /// Task that owns `path` in this run, if any.
    pub fn owner(&self, path: &Path) -> Option<TaskName> {
        let owners = self.owners.lock().unwrap_or_else(|e| e.into_inner());
        owners.get(path).cloned()
    }

    /// Number of claimed destination files.
    pub fn len(&self) -> usize {
        let owners = self.owners.lock().unwrap_or_else(|e| e.into_inner());
        owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
