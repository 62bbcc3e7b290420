// src/tasks/images.rs

use std::sync::LazyLock;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use regex::Regex;
use tracing::debug;

use crate::pipeline::stages::{Map, Newer, WriteTo};
use crate::pipeline::{FileUnit, Pipeline, Source};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Quality used when re-encoding JPEG files.
pub const JPEG_QUALITY: u8 = 85;

static SVG_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("invalid svg comment regex"));

static SVG_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("invalid svg whitespace regex"));

fn optimize_png(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decoding PNG")?;
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).context("encoding PNG")?;
    Ok(out)
}

fn optimize_jpeg(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decoding JPEG")?;
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .context("encoding JPEG")?;
    Ok(out)
}

fn optimize_svg(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let text = std::str::from_utf8(bytes).context("SVG is not valid UTF-8")?;
    let text = SVG_COMMENT.replace_all(text, "");
    let text = SVG_GAP.replace_all(&text, "><");
    Ok(text.trim().as_bytes().to_vec())
}

/// Optimize one image by extension. The result is only used when it is
/// smaller than the input; unknown formats pass through unchanged.
pub fn optimize_image(bytes: &[u8], extension: Option<&str>) -> anyhow::Result<Vec<u8>> {
    let optimized = match extension {
        Some("png") => optimize_png(bytes)?,
        Some("jpg") | Some("jpeg") => optimize_jpeg(bytes)?,
        Some("svg") => optimize_svg(bytes)?,
        _ => return Ok(bytes.to_vec()),
    };

    if optimized.len() < bytes.len() {
        Ok(optimized)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Incremental image copy with per-file optimization.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTask;

impl ImageTask {
    pub const NAME: &'static str = "images";

    fn pipeline(ctx: &TaskContext) -> Pipeline {
        let spec = &ctx.paths.images;

        let optimize = Map::blocking("optimize", |mut unit: FileUnit| {
            let before = unit.contents.len();
            unit.contents = optimize_image(&unit.contents, unit.extension().as_deref())?;
            debug!(
                file = %unit.source.display(),
                before,
                after = unit.contents.len(),
                "optimized image"
            );
            Ok(Some(unit))
        });

        Pipeline::new(Self::NAME)
            .stage(Newer::new(&spec.dest))
            .stage(optimize)
            .stage(WriteTo::new(Self::NAME, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for ImageTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let source = Source::from_spec(&ctx.paths.root, &ctx.paths.images)?;
            let report = Self::pipeline(ctx).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
