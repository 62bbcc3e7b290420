use std::error::Error;
use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageBuffer, Rgb};
use rigbuild::tasks::images::optimize_image;
use rigbuild::tasks::{ImageTask, Task};
use rigbuild_test_utils::{MemoryConfigProvider, ThemeConfigBuilder, ThemeFixture, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

/// A loosely compressed PNG with plenty of room to shrink.
fn fat_png() -> Vec<u8> {
    let img = ImageBuffer::from_fn(96, 96, |x, y| Rgb([(x % 8) as u8 * 30, (y % 8) as u8 * 30, 90]));
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .expect("encode test png");
    out
}

const SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <!-- drawn by hand -->\n  <rect width=\"10\" height=\"10\"/>\n</svg>\n";

#[test]
fn png_is_reencoded_losslessly_and_never_grows() -> TestResult {
    let input = fat_png();
    let output = optimize_image(&input, Some("png"))?;
    assert!(output.len() <= input.len());

    let before = image::load_from_memory(&input)?.to_rgb8();
    let after = image::load_from_memory(&output)?.to_rgb8();
    assert_eq!(before, after);
    Ok(())
}

#[test]
fn svg_loses_comments_and_gaps() -> TestResult {
    let out = optimize_image(SVG.as_bytes(), Some("svg"))?;
    assert_eq!(
        String::from_utf8(out)?,
        "<svg xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"10\" height=\"10\"/></svg>"
    );
    Ok(())
}

#[test]
fn other_formats_pass_through() -> TestResult {
    let bytes = b"GIF89a not really".to_vec();
    assert_eq!(optimize_image(&bytes, Some("gif"))?, bytes);
    assert!(optimize_image(b"not a png", Some("png")).is_err());
    Ok(())
}

#[tokio::test]
async fn image_task_optimizes_incrementally() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/assets/images/logo.png", fat_png());
    fixture.write("dev/assets/images/icons/menu.svg", SVG);
    fixture.write("dev/assets/images/broken.png", "definitely not a png");
    fixture.write("dev/assets/images/notes.txt", "ignored");
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);

    let report = ImageTask.run(&ctx).await?;
    assert_eq!(report.files, 3);
    assert_eq!(report.written, 2);
    assert_eq!(report.errors, 1);

    assert!(fixture.read_bytes("theme/assets/images/logo.png").len() <= fat_png().len());
    assert!(!fixture.read("theme/assets/images/icons/menu.svg").contains("<!--"));
    assert!(!fixture.exists("theme/assets/images/notes.txt"));
    assert!(!fixture.exists("verbose/assets/images/logo.png"));

    let again = ImageTask.run(&ctx).await?;
    assert_eq!(again.written, 0);
    assert_eq!(again.skipped, 2);
    Ok(())
}
