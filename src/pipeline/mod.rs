// src/pipeline/mod.rs

//! Streaming stage chains.
//!
//! A [`Pipeline`] reads the files selected by a source pattern and pushes
//! each one through a chain of [`Stage`]s. Every stage runs in its own Tokio
//! task and is connected to the next by a bounded channel, so a stage only
//! pulls its next file once downstream has room, and different files can sit
//! in different stages at the same time.
//!
//! Error policy:
//! - a stage returning `Err` for a file is a *per-file* error: it is logged
//!   with the file identity, the file is dropped, and the remaining files
//!   keep flowing;
//! - an unreadable source base or an uncreatable output root is fatal and is
//!   returned from [`Pipeline::run`] before any file is processed.

pub mod claims;
pub mod stages;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::errors::{Result, RigError};
use crate::paths::PathSpec;
use crate::watch::patterns::{PatternSet, collect_matching_files};

pub use claims::WriteClaims;

/// Channel capacity between two stages.
const STAGE_BUFFER: usize = 4;

/// One file travelling through a stage chain.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUnit {
    /// Absolute path the file was read from.
    pub source: PathBuf,
    /// Path relative to the source base; destinations are derived from it.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl fmt::Debug for FileUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUnit")
            .field("source", &self.source)
            .field("relative", &self.relative)
            .field("len", &self.contents.len())
            .finish()
    }
}

impl FileUnit {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents,
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| anyhow!("{} is not valid UTF-8: {}", self.source.display(), e))
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Lower-cased extension of the relative path.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Future returned by [`Stage::process`].
pub type StageFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<FileUnit>>> + Send + 'a>>;

/// A single step in a stage chain.
///
/// `Ok(Some(unit))` forwards the (possibly rewritten) file, `Ok(None)` drops
/// it on purpose (e.g. "not newer than destination"), `Err` is a per-file
/// error.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a>;
}

/// Counts produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Files matched by the source pattern.
    pub matched: usize,
    /// Files that reached the end of the chain.
    pub emitted: usize,
    /// Files deliberately dropped by a stage.
    pub dropped: usize,
    /// Files that failed in some stage (logged and skipped).
    pub errors: usize,
    /// Surviving units, only filled when the pipeline collects its output.
    pub output: Vec<FileUnit>,
}

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicUsize,
    errors: AtomicUsize,
}

/// Where a pipeline reads its files from.
#[derive(Debug, Clone)]
pub struct Source {
    root: PathBuf,
    base: PathBuf,
    patterns: PatternSet,
}

impl Source {
    pub fn new(root: impl Into<PathBuf>, base: impl Into<PathBuf>, patterns: PatternSet) -> Self {
        Self {
            root: root.into(),
            base: base.into(),
            patterns,
        }
    }

    /// Source described by a path spec of the given project root.
    pub fn from_spec(root: &Path, spec: &PathSpec) -> Result<Self> {
        Ok(Self::new(root, &spec.base, PatternSet::from_spec(spec)?))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn list(&self) -> Result<Vec<PathBuf>> {
        collect_matching_files(&self.root, &self.base, &self.patterns).map_err(|source| {
            RigError::SourceRoot {
                path: self.base.clone(),
                source,
            }
        })
    }
}

/// A named chain of stages fed by a [`Source`].
pub struct Pipeline {
    task: TaskName,
    stages: Vec<Arc<dyn Stage>>,
    output_roots: Vec<PathBuf>,
    collect: bool,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("task", &self.task)
            .field("stages", &names)
            .field("output_roots", &self.output_roots)
            .finish()
    }
}

impl Pipeline {
    pub fn new(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            stages: Vec::new(),
            output_roots: Vec::new(),
            collect: false,
        }
    }

    /// Append a stage to the chain.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Declare a directory this pipeline writes into. It must be creatable
    /// before the run starts.
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_roots.push(root.into());
        self
    }

    /// Declare every destination of a path spec.
    pub fn output_roots_from(mut self, spec: &PathSpec) -> Self {
        self.output_roots.extend(spec.output_roots());
        self
    }

    /// Keep the surviving units in [`PipelineReport::output`].
    pub fn collect_output(mut self) -> Self {
        self.collect = true;
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the chain over every file selected by `source`.
    pub async fn run(self, source: &Source) -> Result<PipelineReport> {
        let files = source.list()?;

        for root in &self.output_roots {
            std::fs::create_dir_all(root).map_err(|e| RigError::DestinationRoot {
                path: root.clone(),
                source: e,
            })?;
        }

        debug!(
            task = %self.task,
            files = files.len(),
            stages = ?self.stage_names(),
            "starting pipeline"
        );

        let matched = files.len();
        let counters = Arc::new(Counters::default());

        // Producer: read files in order, one unit at a time.
        let (first_tx, mut rx) = mpsc::channel::<FileUnit>(STAGE_BUFFER);
        let producer = {
            let task = self.task.clone();
            let base = source.base.clone();
            let counters = Arc::clone(&counters);
            tokio::spawn(async move {
                for path in files {
                    match read_unit(&base, &path).await {
                        Ok(unit) => {
                            if first_tx.send(unit).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(task = %task, file = %path.display(), error = %err, "failed to read file; skipping");
                            counters.errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        };

        let mut workers = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let (tx, next_rx) = mpsc::channel::<FileUnit>(STAGE_BUFFER);
            let task = self.task.clone();
            let counters = Arc::clone(&counters);
            let mut stage_rx = rx;
            workers.push(tokio::spawn(async move {
                while let Some(unit) = stage_rx.recv().await {
                    let file = unit.source.clone();
                    match stage.process(unit).await {
                        Ok(Some(unit)) => {
                            if tx.send(unit).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            counters.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            warn!(
                                task = %task,
                                stage = stage.name(),
                                file = %file.display(),
                                error = format!("{err:#}"),
                                "file failed; skipping"
                            );
                            counters.errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }));
            rx = next_rx;
        }

        let mut emitted = 0;
        let mut output = Vec::new();
        while let Some(unit) = rx.recv().await {
            emitted += 1;
            if self.collect {
                output.push(unit);
            }
        }

        producer
            .await
            .context("pipeline producer panicked")?;
        for worker in workers {
            worker.await.context("pipeline stage panicked")?;
        }

        let report = PipelineReport {
            matched,
            emitted,
            dropped: counters.dropped.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            output,
        };

        debug!(
            task = %self.task,
            matched = report.matched,
            emitted = report.emitted,
            dropped = report.dropped,
            errors = report.errors,
            "pipeline finished"
        );

        Ok(report)
    }
}

async fn read_unit(base: &Path, path: &Path) -> anyhow::Result<FileUnit> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {:?}", path))?;
    let relative = path
        .strip_prefix(base)
        .with_context(|| format!("{:?} is not under {:?}", path, base))?
        .to_path_buf();
    Ok(FileUnit::new(path, relative, contents))
}
