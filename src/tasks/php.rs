// src/tasks/php.rs

use std::sync::Mutex;

use tracing::info;

use crate::config::ThemeConfig;
use crate::pipeline::stages::{Branch, External, Lint, Newer, ReplaceTokens, WriteTo};
use crate::pipeline::{Pipeline, Source};
use crate::tasks::lint::PhpLinter;
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Remembers the slug/name the PHP task last built with.
///
/// A run is a *rebuild* (every file processed, not just newer ones) when it
/// is the first run in this process or when the slug or name changed since
/// the previous run.
#[derive(Debug, Default)]
pub struct RebuildTracker {
    last: Mutex<Option<(String, String)>>,
}

impl RebuildTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether this run is a rebuild and record the current identity.
    pub fn check(&self, slug: &str, name: &str) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let rebuild = match last.as_ref() {
            None => true,
            Some((s, n)) => s != slug || n != name,
        };
        if rebuild {
            *last = Some((slug.to_string(), name.to_string()));
        }
        rebuild
    }
}

/// Lint PHP sources, replace placeholder tokens and write them to the
/// verbose and final trees.
#[derive(Debug, Default)]
pub struct PhpTask {
    tracker: RebuildTracker,
}

impl PhpTask {
    pub const NAME: &'static str = "php";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> &RebuildTracker {
        &self.tracker
    }

    fn pipeline(&self, ctx: &TaskContext, config: &ThemeConfig, rebuild: bool) -> Pipeline {
        let spec = &ctx.paths.php;
        let mut pipeline = Pipeline::new(Self::NAME)
            .stage(Branch::when("newer", !rebuild, Newer::new(&spec.dest)))
            .stage(Lint::new(PhpLinter));

        if let Some(cmd) = &config.tools.php_lint {
            pipeline = pipeline.stage(External::advisory("phpcs", cmd));
        }

        pipeline = pipeline.stage(ReplaceTokens::new(&config.slug, &config.name));
        if let Some(verbose) = &spec.verbose_dest {
            pipeline = pipeline.stage(WriteTo::new(Self::NAME, verbose, ctx.claims.clone()));
        }
        pipeline
            .stage(WriteTo::new(Self::NAME, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for PhpTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let rebuild = self.tracker.check(&config.slug, &config.name);
            if rebuild {
                info!(slug = %config.slug, name = %config.name, "rebuilding all PHP files");
            }

            let source = Source::from_spec(&ctx.paths.root, &ctx.paths.php)?;
            let report = self.pipeline(ctx, &config, rebuild).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
