// src/tasks/sass.rs

//! Developer-convenience Sass compile.
//!
//! Non-partial `.scss` files are compiled next to their source (the style
//! task picks the generated `.css` up on its next run) together with a
//! source map under a sibling `maps/` directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::debug;

use crate::engine::TaskName;
use crate::pipeline::stages::{Map, WriteTo};
use crate::pipeline::{FileUnit, Pipeline, Source, Stage, StageFuture, WriteClaims};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Directory, relative to the generated CSS file, that holds source maps.
pub const MAPS_DIR: &str = "maps";

/// Compile one Sass source, resolving imports relative to its directory.
pub fn compile_scss(source: &Path, scss: &str) -> anyhow::Result<String> {
    let mut options = grass::Options::default();
    if let Some(dir) = source.parent() {
        options = options.load_path(dir);
    }
    grass::from_string(scss.to_string(), &options)
        .map_err(|e| anyhow!("compiling {}: {e}", source.display()))
}

/// Replace each leading run of `width` spaces with a tab.
pub fn tabify(text: &str, width: usize) -> String {
    let unit = " ".repeat(width);
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut rest = line;
        while let Some(stripped) = rest.strip_prefix(unit.as_str()) {
            out.push('\t');
            rest = stripped;
        }
        out.push_str(rest);
    }
    out
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Version 3 source map for a compiled file. The compiler does not report
/// segment positions, so `mappings` is empty.
pub fn source_map(css_file: &str, scss_file: &str) -> String {
    format!(
        "{{\"version\":3,\"file\":{},\"sources\":[{}],\"names\":[],\"mappings\":\"\"}}\n",
        json_string(css_file),
        json_string(&format!("../{scss_file}")),
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes `maps/<name>.css.map` next to each compiled file.
struct WriteSourceMap {
    task: TaskName,
    dir: PathBuf,
    claims: WriteClaims,
}

impl Stage for WriteSourceMap {
    fn name(&self) -> &str {
        "sourcemaps"
    }

    fn process<'a>(&'a self, unit: FileUnit) -> StageFuture<'a> {
        Box::pin(async move {
            let css_name = file_name(&unit.relative);
            let scss_name = file_name(&unit.source);

            let css_dir = match unit.relative.parent() {
                Some(parent) => self.dir.join(parent),
                None => self.dir.clone(),
            };
            let map_path = css_dir.join(MAPS_DIR).join(format!("{css_name}.map"));

            self.claims.claim(&map_path, &self.task)?;
            if let Some(parent) = map_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {:?}", parent))?;
            }
            tokio::fs::write(&map_path, source_map(&css_name, &scss_name))
                .await
                .with_context(|| format!("writing {:?}", map_path))?;

            debug!(map = %map_path.display(), "wrote source map");
            Ok(Some(unit))
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SassTask;

impl SassTask {
    pub const NAME: &'static str = "sassStyles";

    fn pipeline(ctx: &TaskContext) -> Pipeline {
        let spec = &ctx.paths.sass;

        let compile = Map::blocking("sass", |mut unit: FileUnit| {
            let css = compile_scss(&unit.source, unit.text()?)?;
            unit.relative.set_extension("css");
            let map_name = format!("{}.map", file_name(&unit.relative));
            let mut out = tabify(&css, 2);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("\n/*# sourceMappingURL={MAPS_DIR}/{map_name} */\n"));
            unit.set_text(out);
            Ok(Some(unit))
        });

        Pipeline::new(Self::NAME)
            .stage(compile)
            .stage(WriteSourceMap {
                task: Self::NAME.to_string(),
                dir: spec.dest.clone(),
                claims: ctx.claims.clone(),
            })
            .stage(WriteTo::new(Self::NAME, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for SassTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let source = Source::from_spec(&ctx.paths.root, &ctx.paths.sass)?;
            let report = Self::pipeline(ctx).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
