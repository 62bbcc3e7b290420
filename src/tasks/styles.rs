// src/tasks/styles.rs

use std::sync::Arc;

use crate::config::{StyleVariables, ThemeConfig};
use crate::pipeline::stages::{Branch, Lint, Map, ReplaceTokens, WriteTo};
use crate::pipeline::{FileUnit, Pipeline, Source};
use crate::tasks::css::{
    add_vendor_prefixes, minify_css, resolve_custom_media, resolve_custom_properties,
};
use crate::tasks::lint::StyleLinter;
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Compile production CSS: polyfill custom properties and custom media,
/// prefix, replace tokens, write the verbose copy, minify unless
/// `debug.styles`, write the final copy.
///
/// Style variables are re-read on every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleTask;

impl StyleTask {
    pub const NAME: &'static str = "styles";

    fn pipeline(ctx: &TaskContext, config: &ThemeConfig, vars: StyleVariables) -> Pipeline {
        let spec = &ctx.paths.styles;
        let vars = Arc::new(vars);
        let prefix = !config.browser_targets.is_empty();

        let compile = Map::text("postcss", move |css| {
            let css = resolve_custom_properties(css, &vars.variables);
            let css = resolve_custom_media(&css, &vars.queries);
            Ok(if prefix { add_vendor_prefixes(&css) } else { css })
        });

        let minify = Map::blocking("minify", |mut unit: FileUnit| {
            let min = minify_css(unit.text()?)?;
            unit.set_text(min);
            Ok(Some(unit))
        });

        let mut pipeline = Pipeline::new(Self::NAME)
            .stage(Lint::new(StyleLinter))
            .stage(compile)
            .stage(ReplaceTokens::new(&config.slug, &config.name));

        if let Some(verbose) = &spec.verbose_dest {
            pipeline = pipeline.stage(WriteTo::new(Self::NAME, verbose, ctx.claims.clone()));
        }

        pipeline
            .stage(Branch::when("minify", !config.debug.styles, minify))
            .stage(WriteTo::new(Self::NAME, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for StyleTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let vars = ctx.config.load_style_variables()?;

            let source = Source::from_spec(&ctx.paths.root, &ctx.paths.styles)?;
            let report = Self::pipeline(ctx, &config, vars).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
