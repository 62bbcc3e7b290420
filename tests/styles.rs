use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use rigbuild::tasks::css::{
    add_vendor_prefixes, minify_css, resolve_custom_media, resolve_custom_properties,
};
use rigbuild::tasks::sass::{source_map, tabify};
use rigbuild::tasks::{SassTask, StyleTask, Task};
use rigbuild_test_utils::{MemoryConfigProvider, ThemeConfigBuilder, ThemeFixture, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn custom_properties_resolve_and_root_declarations_go() {
    let css = ":root {\n  --accent: #c00;\n}\na { color: var(--accent); }\n";
    let out = resolve_custom_properties(css, &BTreeMap::new());
    assert!(out.contains("color: #c00;"), "{out}");
    assert!(!out.contains("--accent"), "{out}");
    assert!(!out.contains(":root"), "{out}");
}

#[test]
fn custom_properties_fallbacks_and_nesting() {
    let table = vars(&[("--gap", "var(--base)"), ("--base", "1rem")]);
    let css = "a { margin: var(--gap); padding: var(--missing, 2px); top: var(--unknown); }";
    let out = resolve_custom_properties(css, &table);
    assert_eq!(
        out,
        "a { margin: 1rem; padding: 2px; top: var(--unknown); }"
    );
}

#[test]
fn root_declarations_override_variables_file() {
    let table = vars(&[("--accent", "blue")]);
    let css = ":root { --accent: green; }\np { color: var(--accent); }";
    let out = resolve_custom_properties(css, &table);
    assert!(out.contains("color: green;"), "{out}");
}

#[test]
fn custom_media_is_expanded() {
    let queries = vars(&[("--wide", "(min-width: 60em)")]);
    let css = "@custom-media --narrow (max-width: 30em);\n@media (--narrow) { a { top: 0; } }\n@media screen and (--wide) { b { top: 0; } }\n";
    let out = resolve_custom_media(css, &queries);
    assert!(!out.contains("@custom-media"), "{out}");
    assert!(out.contains("@media (max-width: 30em) {"), "{out}");
    assert!(out.contains("@media screen and (min-width: 60em) {"), "{out}");
}

#[test]
fn vendor_prefixes_are_added_for_known_properties() {
    let out = add_vendor_prefixes("a { user-select: none; color: red; appearance: none }");
    assert!(
        out.contains("-webkit-user-select: none; -moz-user-select: none; -ms-user-select: none; user-select: none;"),
        "{out}"
    );
    assert!(out.contains("-webkit-appearance: none; -moz-appearance: none; appearance: none"), "{out}");
    assert!(out.contains("color: red;"));
    assert!(!out.contains("-webkit-color"));
}

#[test]
fn minify_compresses_whitespace() -> TestResult {
    let out = minify_css("a {\n  color: red;\n}\n\nb {\n  margin: 0;\n}\n")?;
    assert!(out.contains("a{color:red}"), "{out}");
    assert!(!out.contains("\n  "));
    Ok(())
}

#[test]
fn tabify_converts_leading_indent_only() {
    assert_eq!(tabify("a {\n    b: c  d;\n  }\n", 2), "a {\n\t\tb: c  d;\n\t}\n");
}

#[test]
fn source_map_is_version_three() {
    let map = source_map("main.css", "main.scss");
    assert!(map.contains("\"version\":3"));
    assert!(map.contains("\"file\":\"main.css\""));
    assert!(map.contains("\"sources\":[\"../main.scss\"]"));
}

const STYLE: &str = ":root { --text: #222; }\n/* Theme: WP Rig */\n.wprig-header {\n  color: var(--text);\n  user-select: none;\n}\n";

#[tokio::test]
async fn style_task_writes_verbose_and_minified() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/assets/css/global.css", STYLE);
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new()
            .slug("acme")
            .name("Acme")
            .browser_target("> 1%")
            .build(),
    ));
    let ctx = fixture.context(provider);

    let report = StyleTask.run(&ctx).await?;
    assert_eq!(report.written, 1);
    assert_eq!(report.errors, 0);

    let verbose = fixture.read("verbose/assets/css/global.css");
    assert!(verbose.contains(".acme-header {"), "{verbose}");
    assert!(verbose.contains("color: #222;"), "{verbose}");
    assert!(verbose.contains("-webkit-user-select: none;"), "{verbose}");
    assert!(verbose.contains("Theme: Acme"), "{verbose}");

    let min = fixture.read("theme/assets/css/global.css");
    assert!(min.contains(".acme-header{"), "{min}");
    assert!(min.contains("color:#222"), "{min}");
    assert!(min.len() < verbose.len());
    Ok(())
}

#[tokio::test]
async fn debug_styles_skips_minification() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/assets/css/global.css", STYLE);
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().debug_styles(true).build(),
    ));
    let ctx = fixture.context(provider);

    StyleTask.run(&ctx).await?;
    assert_eq!(
        fixture.read("theme/assets/css/global.css"),
        fixture.read("verbose/assets/css/global.css")
    );
    // No browser targets, no prefixes.
    assert!(!fixture.read("theme/assets/css/global.css").contains("-webkit-"));
    Ok(())
}

#[tokio::test]
async fn style_variables_are_reread_every_run() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/style.css", "body { color: var(--body); }\n");
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().debug_styles(true).build(),
    ));
    let ctx = fixture.context(provider.clone());

    provider.set_variable("--body", "black");
    StyleTask.run(&ctx).await?;
    assert!(fixture.read("theme/style.css").contains("color: black;"));

    provider.set_variable("--body", "navy");
    StyleTask.run(&ctx).await?;
    assert!(fixture.read("theme/style.css").contains("color: navy;"));
    Ok(())
}

#[tokio::test]
async fn invalid_css_is_a_per_file_error() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/good.css", "a { color: red; }\n");
    fixture.write("dev/bad.css", "a { color: red;\n");
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);

    let report = StyleTask.run(&ctx).await?;
    assert_eq!(report.files, 2);
    assert_eq!(report.written, 1);
    assert_eq!(report.errors, 1);
    assert!(fixture.exists("theme/good.css"));
    assert!(!fixture.exists("theme/bad.css"));
    Ok(())
}

#[tokio::test]
async fn sass_compiles_next_to_source_with_map() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("dev/assets/sass/_colors.scss", "$accent: #0a0;\n");
    fixture.write(
        "dev/assets/sass/main.scss",
        "@import \"colors\";\n.nav {\n  a {\n    color: $accent;\n  }\n}\n",
    );
    fixture.write("dev/assets/sass/broken.scss", ".x { color: $nope; }\n");
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);

    let report = SassTask.run(&ctx).await?;
    assert_eq!(report.files, 2);
    assert_eq!(report.written, 1);
    assert_eq!(report.errors, 1);

    let css = fixture.read("dev/assets/sass/main.css");
    assert!(css.contains(".nav a {\n\tcolor: #0a0;\n}"), "{css}");
    assert!(css.ends_with("/*# sourceMappingURL=maps/main.css.map */\n"), "{css}");
    assert!(fixture.exists("dev/assets/sass/maps/main.css.map"));
    assert!(!fixture.exists("dev/assets/sass/_colors.css"));
    assert!(!fixture.exists("dev/assets/sass/broken.css"));
    Ok(())
}
