// src/watch/dispatcher.rs

//! Turns debounced file events into graph runs.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::config::WatchSettings;
use crate::engine::{BindingQueue, GraphRunner, TriggerDecision};
use crate::watch::WatchBinding;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::collect_matching_files;

/// Counters for one dispatcher session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Debounce windows flushed.
    pub batches: usize,
    /// Events dropped because the file content had not changed.
    pub unchanged: usize,
    pub started: usize,
    pub queued: usize,
    pub coalesced: usize,
    /// Graph runs that finished (successfully or not).
    pub finished: usize,
    pub failed: usize,
}

/// Completion of one binding run: binding index and success.
type RunDone = (usize, bool);

pub struct Dispatcher {
    root: PathBuf,
    bindings: Arc<Vec<WatchBinding>>,
    runner: GraphRunner,
    queue: BindingQueue,
    hashes: Option<ContentHashes>,
    debounce: Duration,
    stats: DispatchStats,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.root)
            .field("bindings", &self.bindings.len())
            .field("debounce", &self.debounce)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
        runner: GraphRunner,
        settings: &WatchSettings,
    ) -> Self {
        // Watcher events carry canonical paths.
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            bindings: Arc::new(bindings),
            runner,
            queue: BindingQueue::new(settings.triggered_while_running),
            hashes: settings.use_hash.then(ContentHashes::new),
            debounce: Duration::from_millis(settings.debounce_ms),
            stats: DispatchStats::default(),
        }
    }

    /// Record the current content of every watched file, so that touching a
    /// file without changing it does not trigger a run.
    pub fn seed_hashes(&mut self) {
        let Some(hashes) = self.hashes.as_mut() else {
            return;
        };
        for binding in self.bindings.iter() {
            match collect_matching_files(&self.root, &binding.base, &binding.patterns) {
                Ok(files) => {
                    for file in files {
                        hashes.remember(&file);
                    }
                }
                Err(err) => {
                    debug!(binding = %binding.name, error = %err, "skipping hash seed");
                }
            }
        }
        debug!(files = hashes.len(), "content hashes seeded");
    }

    /// Indices of the bindings that watch `path`.
    pub fn matching_bindings(&self, path: &Path) -> Vec<usize> {
        let Some(rel) = relative_str(&self.root, path) else {
            warn!(path = %path.display(), root = %self.root.display(), "event outside watch root");
            return Vec::new();
        };
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.patterns.matches(&rel))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Dispatch events until `shutdown` resolves or the event channel
    /// closes and every started run has finished.
    pub async fn run_until<F>(
        mut self,
        mut events: mpsc::UnboundedReceiver<PathBuf>,
        shutdown: F,
    ) -> DispatchStats
    where
        F: Future<Output = ()>,
    {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RunDone>();
        let mut batch: BTreeSet<PathBuf> = BTreeSet::new();
        let mut deadline: Option<Instant> = None;
        let mut events_open = true;

        tokio::pin!(shutdown);
        info!(bindings = self.bindings.len(), "watching for changes");

        loop {
            if !events_open && deadline.is_none() && self.queue.is_idle() {
                debug!("event source closed and no runs in flight");
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("watch shutdown requested");
                    break;
                }
                event = events.recv(), if events_open => match event {
                    Some(path) => {
                        batch.insert(path);
                        deadline.get_or_insert_with(|| Instant::now() + self.debounce);
                    }
                    None => {
                        events_open = false;
                        // Flush what is left without waiting out the window.
                        if deadline.is_some() {
                            deadline = Some(Instant::now());
                        }
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let paths = std::mem::take(&mut batch);
                    self.flush(paths, &done_tx);
                }
                Some((idx, ok)) = done_rx.recv() => {
                    self.stats.finished += 1;
                    if !ok {
                        self.stats.failed += 1;
                    }
                    if self.queue.finish(idx) {
                        self.spawn_run(idx, &done_tx);
                    }
                }
            }
        }

        info!(stats = ?self.stats, "watch dispatcher stopped");
        self.stats
    }

    fn flush(&mut self, paths: BTreeSet<PathBuf>, done_tx: &mpsc::UnboundedSender<RunDone>) {
        self.stats.batches += 1;
        let mut triggered: BTreeSet<usize> = BTreeSet::new();

        for path in paths {
            if path.is_dir() {
                continue;
            }
            let matches = self.matching_bindings(&path);
            if matches.is_empty() {
                continue;
            }
            if let Some(hashes) = self.hashes.as_mut() {
                if !hashes.changed(&path) {
                    debug!(file = %path.display(), "content unchanged; ignoring event");
                    self.stats.unchanged += 1;
                    continue;
                }
            }
            debug!(file = %path.display(), bindings = ?matches, "change detected");
            triggered.extend(matches);
        }

        for idx in triggered {
            match self.queue.trigger(idx) {
                TriggerDecision::Start => self.spawn_run(idx, done_tx),
                TriggerDecision::Queued => self.stats.queued += 1,
                TriggerDecision::Coalesced => self.stats.coalesced += 1,
            }
        }
    }

    /// Start a run of binding `idx`. The queue must already count it as
    /// running.
    fn spawn_run(&mut self, idx: usize, done_tx: &mpsc::UnboundedSender<RunDone>) {
        self.stats.started += 1;
        let binding = &self.bindings[idx];
        info!(binding = %binding.name, "running watch binding");

        let runner = self.runner.clone();
        let graph = binding.graph.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let outcome = runner.run(&graph).await;
            // The dispatcher may already be gone after shutdown.
            let _ = done_tx.send((idx, outcome.succeeded()));
        });
    }
}
