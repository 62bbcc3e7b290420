// src/tasks/copy.rs

use crate::paths::PathSpec;
use crate::pipeline::stages::{Newer, WriteTo};
use crate::pipeline::{Pipeline, Source};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};
use crate::types::AssetCategory;

/// Incremental copy of files that need no transformation (script
/// libraries, pre-minified scripts) into the verbose and final trees.
#[derive(Debug, Clone, Copy)]
pub struct CopyTask {
    category: AssetCategory,
}

impl CopyTask {
    /// `jsLibs`: third-party libraries, copied verbatim.
    pub fn script_libs() -> Self {
        Self {
            category: AssetCategory::ScriptLibs,
        }
    }

    /// `jsMin`: already-minified scripts, copied verbatim.
    pub fn scripts_min() -> Self {
        Self {
            category: AssetCategory::ScriptsMin,
        }
    }

    fn pipeline(&self, ctx: &TaskContext, spec: &PathSpec) -> Pipeline {
        let name = self.category.as_str();
        // Libraries are checked against the verbose mirror, everything else
        // against the final tree.
        let check = match (&self.category, &spec.verbose_dest) {
            (AssetCategory::ScriptLibs, Some(verbose)) => verbose,
            _ => &spec.dest,
        };

        let mut pipeline = Pipeline::new(name).stage(Newer::new(check));
        if let Some(verbose) = &spec.verbose_dest {
            pipeline = pipeline.stage(WriteTo::new(name, verbose, ctx.claims.clone()));
        }
        pipeline
            .stage(WriteTo::new(name, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for CopyTask {
    fn name(&self) -> &str {
        self.category.as_str()
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let spec = ctx.paths.spec(self.category);
            let source = Source::from_spec(&ctx.paths.root, spec)?;
            let report = self.pipeline(ctx, spec).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
