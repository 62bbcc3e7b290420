// src/pipeline/stages.rs

//! Built-in stages shared by the transform tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::exec::run_with_stdin;

use super::{FileUnit, Stage, StageFuture, WriteClaims};

/// Placeholder slug found in theme sources.
pub const SLUG_PLACEHOLDER: &str = "wprig";
/// Placeholder theme name found in theme sources.
pub const NAME_PLACEHOLDER: &str = "WP Rig";

/// Drops files whose destination is at least as new as the source.
#[derive(Debug, Clone)]
pub struct Newer {
    dest: PathBuf,
}

impl Newer {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

/// True when `source` was modified after `dest`, or `dest` is missing.
pub fn is_newer(source: &Path, dest: &Path) -> bool {
    let dest_mtime = match std::fs::metadata(dest).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return true,
    };
    match std::fs::metadata(source).and_then(|m| m.modified()) {
        Ok(src_mtime) => src_mtime > dest_mtime,
        Err(_) => true,
    }
}

impl Stage for Newer {
    fn name(&self) -> &str {
        "newer"
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            let dest = self.dest.join(&unit.relative);
            if is_newer(&unit.source, &dest) {
                Ok(Some(unit))
            } else {
                debug!(file = %unit.source.display(), "destination up to date");
                Ok(None)
            }
        })
    }
}

/// Replace the placeholder slug and name with configured values.
#[derive(Debug, Clone)]
pub struct ReplaceTokens {
    slug: String,
    name: String,
}

impl ReplaceTokens {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
        }
    }

    /// Apply the replacement to a piece of text in one pass, so a
    /// configured name containing the slug placeholder is left alone.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        loop {
            let name_at = rest.find(NAME_PLACEHOLDER);
            let slug_at = rest.find(SLUG_PLACEHOLDER);
            let (at, len, value) = match (name_at, slug_at) {
                (Some(n), Some(s)) if s < n => (s, SLUG_PLACEHOLDER.len(), &self.slug),
                (Some(n), _) => (n, NAME_PLACEHOLDER.len(), &self.name),
                (None, Some(s)) => (s, SLUG_PLACEHOLDER.len(), &self.slug),
                (None, None) => break,
            };
            out.push_str(&rest[..at]);
            out.push_str(value);
            rest = &rest[at + len..];
        }
        out.push_str(rest);
        out
    }
}

impl Stage for ReplaceTokens {
    fn name(&self) -> &str {
        "replace-tokens"
    }

    fn process<'a>(&'a self, mut unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            // Binary files pass through untouched.
            let replaced = match std::str::from_utf8(&unit.contents) {
                Ok(text) => self.apply(text),
                Err(_) => return Ok(Some(unit)),
            };
            unit.set_text(replaced);
            Ok(Some(unit))
        })
    }
}

/// Write each file under `dir`, keeping its relative path.
///
/// Every destination is claimed for `task` first; see [`WriteClaims`].
#[derive(Debug, Clone)]
pub struct WriteTo {
    task: TaskName,
    dir: PathBuf,
    claims: WriteClaims,
}

impl WriteTo {
    pub fn new(task: impl Into<TaskName>, dir: impl Into<PathBuf>, claims: WriteClaims) -> Self {
        Self {
            task: task.into(),
            dir: dir.into(),
            claims,
        }
    }
}

impl Stage for WriteTo {
    fn name(&self) -> &str {
        "write"
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            let dest = self.dir.join(&unit.relative);
            self.claims.claim(&dest, &self.task)?;

            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {:?}", parent))?;
            }
            tokio::fs::write(&dest, &unit.contents)
                .await
                .with_context(|| format!("writing {:?}", dest))?;

            debug!(task = %self.task, dest = %dest.display(), "wrote file");
            Ok(Some(unit))
        })
    }
}

/// One advisory finding reported by a [`Linter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    /// 1-based line, 0 when the finding is about the whole file.
    pub line: usize,
    pub message: String,
}

impl LintFinding {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// In-process checker for one kind of source file.
pub trait Linter: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, unit: &FileUnit) -> Vec<LintFinding>;
}

/// Runs a linter and logs its findings. Never blocks the file.
pub struct Lint {
    linter: Arc<dyn Linter>,
}

impl Lint {
    pub fn new(linter: impl Linter + 'static) -> Self {
        Self {
            linter: Arc::new(linter),
        }
    }
}

impl Stage for Lint {
    fn name(&self) -> &str {
        self.linter.name()
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            for finding in self.linter.check(&unit) {
                warn!(
                    linter = self.linter.name(),
                    file = %unit.source.display(),
                    line = finding.line,
                    "{}",
                    finding.message
                );
            }
            Ok(Some(unit))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExternalMode {
    /// stdout replaces the contents; a failing exit is a per-file error.
    Transform,
    /// Output is only reported; the file always continues unchanged.
    Advisory,
}

/// Pipe each file through an external command.
#[derive(Debug, Clone)]
pub struct External {
    label: String,
    command: String,
    mode: ExternalMode,
}

impl External {
    pub fn transform(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            mode: ExternalMode::Transform,
        }
    }

    pub fn advisory(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            mode: ExternalMode::Advisory,
        }
    }
}

impl Stage for External {
    fn name(&self) -> &str {
        &self.label
    }

    fn process<'a>(&'a self, mut unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            let result = run_with_stdin(&self.command, &unit.source, &unit.contents).await;

            match self.mode {
                ExternalMode::Transform => {
                    let output = result?;
                    if !output.success {
                        return Err(anyhow!(
                            "'{}' exited with {:?}: {}",
                            self.command,
                            output.code,
                            output.stderr.trim()
                        ));
                    }
                    unit.contents = output.stdout;
                }
                ExternalMode::Advisory => match result {
                    Ok(output) if output.success => {}
                    Ok(output) => {
                        let report = if output.stderr.trim().is_empty() {
                            String::from_utf8_lossy(&output.stdout).into_owned()
                        } else {
                            output.stderr
                        };
                        for line in report.lines().filter(|l| !l.trim().is_empty()) {
                            warn!(
                                linter = %self.label,
                                file = %unit.source.display(),
                                "{}",
                                line.trim_end()
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            linter = %self.label,
                            file = %unit.source.display(),
                            error = format!("{err:#}"),
                            "external linter could not run"
                        );
                    }
                },
            }
            Ok(Some(unit))
        })
    }
}

type MapFn = dyn Fn(FileUnit) -> anyhow::Result<Option<FileUnit>> + Send + Sync;

/// Arbitrary per-file function.
///
/// `blocking` maps run on Tokio's blocking pool, for CPU-heavy work such as
/// compiling or re-encoding.
pub struct Map {
    label: String,
    f: Arc<MapFn>,
    blocking: bool,
}

impl Map {
    pub fn new<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(FileUnit) -> anyhow::Result<Option<FileUnit>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            f: Arc::new(f),
            blocking: false,
        }
    }

    pub fn blocking<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(FileUnit) -> anyhow::Result<Option<FileUnit>> + Send + Sync + 'static,
    {
        Self {
            blocking: true,
            ..Self::new(label, f)
        }
    }

    /// Rewrite file contents as text.
    pub fn text<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self::new(label, move |mut unit: FileUnit| {
            let out = f(unit.text()?)?;
            unit.set_text(out);
            Ok(Some(unit))
        })
    }
}

impl Stage for Map {
    fn name(&self) -> &str {
        &self.label
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            if self.blocking {
                let f = Arc::clone(&self.f);
                tokio::task::spawn_blocking(move || f(unit))
                    .await
                    .with_context(|| format!("stage '{}' panicked", self.label))?
            } else {
                (self.f)(unit)
            }
        })
    }
}

/// Change the extension of the relative path.
#[derive(Debug, Clone)]
pub struct Rename {
    extension: String,
}

impl Rename {
    pub fn extension(ext: impl Into<String>) -> Self {
        Self {
            extension: ext.into(),
        }
    }
}

impl Stage for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn process<'a>(&'a self, mut unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            unit.relative.set_extension(&self.extension);
            Ok(Some(unit))
        })
    }
}

/// How a [`Branch`] decides.
pub enum BranchPredicate {
    /// Decided once when the chain is built, e.g. from a config flag.
    Fixed(bool),
    /// Decided per file.
    PerFile(Box<dyn Fn(&FileUnit) -> bool + Send + Sync>),
}

/// Route each file to `then` or `otherwise`. A missing `otherwise` passes
/// the file through.
pub struct Branch {
    label: String,
    predicate: BranchPredicate,
    then: Arc<dyn Stage>,
    otherwise: Option<Arc<dyn Stage>>,
}

impl Branch {
    pub fn new(
        label: impl Into<String>,
        predicate: BranchPredicate,
        then: impl Stage + 'static,
        otherwise: Option<Arc<dyn Stage>>,
    ) -> Self {
        Self {
            label: label.into(),
            predicate,
            then: Arc::new(then),
            otherwise,
        }
    }

    /// Run `then` only when `cond` holds.
    pub fn when(label: impl Into<String>, cond: bool, then: impl Stage + 'static) -> Self {
        Self::new(label, BranchPredicate::Fixed(cond), then, None)
    }

    /// Run `then` only for files matching `pred`.
    pub fn per_file<P>(label: impl Into<String>, pred: P, then: impl Stage + 'static) -> Self
    where
        P: Fn(&FileUnit) -> bool + Send + Sync + 'static,
    {
        Self::new(label, BranchPredicate::PerFile(Box::new(pred)), then, None)
    }
}

impl Stage for Branch {
    fn name(&self) -> &str {
        &self.label
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        let taken = match &self.predicate {
            BranchPredicate::Fixed(cond) => *cond,
            BranchPredicate::PerFile(pred) => pred(&unit),
        };
        if taken {
            self.then.process(unit)
        } else {
            match &self.otherwise {
                Some(stage) => stage.process(unit),
                None => Box::pin(async move { Ok(Some(unit)) }),
            }
        }
    }
}
