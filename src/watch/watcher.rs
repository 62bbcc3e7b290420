// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle
/// stops file watching and closes the event channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Watch `root` recursively and forward every created, modified or
/// removed path into the returned channel.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<PathBuf>)> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

    // Called synchronously on notify's thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if is_content_event(&event.kind) => {
                for path in event.paths {
                    // The receiver is gone once the dispatcher has shut down.
                    let _ = tx.send(path);
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "file watcher started");

    Ok((
        WatcherHandle {
            _inner: watcher,
            root,
        },
        rx,
    ))
}
