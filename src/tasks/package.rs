// src/tasks/package.rs

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::ThemeConfig;
use crate::errors::{Result, RigError};
use crate::pipeline::stages::WriteTo;
use crate::pipeline::{FileUnit, Pipeline, Source};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Form of the distributable produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageForm {
    /// `export/<name>.zip`
    Archive(PathBuf),
    /// `export/<name>/`
    Directory(PathBuf),
}

impl PackageForm {
    pub fn for_config(export_root: &Path, config: &ThemeConfig) -> Self {
        if config.export_compress {
            PackageForm::Archive(export_root.join(format!("{}.zip", config.name)))
        } else {
            PackageForm::Directory(export_root.join(&config.name))
        }
    }

    /// The artifact the *other* setting would produce for the same name.
    fn opposite(&self, export_root: &Path, name: &str) -> PathBuf {
        match self {
            PackageForm::Archive(_) => export_root.join(name),
            PackageForm::Directory(_) => export_root.join(format!("{name}.zip")),
        }
    }
}

/// Write `units` into a deflate-compressed archive, each entry under a
/// top-level `<folder>/` directory.
pub fn write_archive(path: &Path, folder: &str, units: &[FileUnit]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for unit in units {
        let entry = format!(
            "{}/{}",
            folder,
            unit.relative.to_string_lossy().replace('\\', "/")
        );
        zip.start_file(entry, options)?;
        zip.write_all(&unit.contents)
            .with_context(|| format!("adding {:?} to archive", unit.relative))?;
    }

    zip.finish()?;
    Ok(())
}

/// True when `path` names an entry strictly below `root`, judged on the
/// path text alone.
pub fn is_strictly_inside(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rel) => {
            let mut components = rel.components().peekable();
            components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

async fn remove_stale(export_root: &Path, path: &Path) -> Result<()> {
    if !is_strictly_inside(export_root, path) {
        return Err(RigError::ConfigError(format!(
            "refusing to remove {:?}: not inside export root {:?}",
            path, export_root
        )));
    }
    let result = if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else if path.exists() {
        tokio::fs::remove_file(path).await
    } else {
        return Ok(());
    };
    result.with_context(|| format!("removing stale export {:?}", path))?;
    info!(path = %path.display(), "removed stale export");
    Ok(())
}

/// Package the final tree for distribution, as a zip archive or a raw
/// directory depending on `export.compress`. Never both.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageTask;

impl PackageTask {
    pub const NAME: &'static str = "bundle";
}

impl Task for PackageTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let spec = &ctx.paths.export;
            let source = Source::from_spec(&ctx.paths.root, spec)?;
            let form = PackageForm::for_config(&spec.dest, &config);
            let opposite = form.opposite(&spec.dest, &config.name);

            remove_stale(&spec.dest, &opposite).await?;

            match form {
                PackageForm::Archive(path) => {
                    let collected = Pipeline::new(Self::NAME)
                        .output_root(&spec.dest)
                        .collect_output()
                        .run(&source)
                        .await?;

                    ctx.claims.claim(&path, Self::NAME)?;
                    let folder = config.name.clone();
                    let units = collected.output.clone();
                    let archive = path.clone();
                    tokio::task::spawn_blocking(move || write_archive(&archive, &folder, &units))
                        .await
                        .context("archive writer panicked")??;

                    info!(archive = %path.display(), files = collected.emitted, "wrote theme archive");
                    Ok(TaskReport {
                        files: collected.matched,
                        written: collected.emitted,
                        skipped: collected.dropped,
                        errors: collected.errors,
                    })
                }
                PackageForm::Directory(dir) => {
                    // A previous raw export may contain files that no longer
                    // exist in the theme.
                    remove_stale(&spec.dest, &dir).await?;
                    let report = Pipeline::new(Self::NAME)
                        .stage(WriteTo::new(Self::NAME, &dir, ctx.claims.clone()))
                        .output_root(&dir)
                        .run(&source)
                        .await?;

                    info!(dir = %dir.display(), files = report.emitted, "exported theme directory");
                    Ok(TaskReport::from(report))
                }
            }
        })
    }
}
