use std::error::Error;
use std::sync::Arc;

use rigbuild::tasks::scripts::minify_js;
use rigbuild::tasks::{CopyTask, ScriptTask, Task};
use rigbuild_test_utils::{MemoryConfigProvider, ThemeConfigBuilder, ThemeFixture, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

const NAV: &str = "/**\n * Navigation for WP Rig.\n */\nconst slug = 'wprig'; // placeholder\n\nfunction init() {\n    const url = \"http://example.com/*not-a-comment*/\";\n    return `${slug} // kept`;\n}\n";

fn setup() -> ThemeFixture {
    let fixture = ThemeFixture::new();
    fixture.write("dev/assets/js/src/navigation.js", NAV);
    fixture.write("dev/assets/js/vendor.min.js", "var a=1;/* wprig */\n");
    fixture.write("dev/assets/js/libs/lib.js", "// library wprig\nvar lib = 1;\n");
    fixture
}

#[test]
fn minify_strips_comments_but_not_strings() {
    let out = minify_js(NAV);
    assert_eq!(
        out,
        "const slug = 'wprig';\nfunction init() {\nconst url = \"http://example.com/*not-a-comment*/\";\nreturn `${slug} // kept`;\n}\n"
    );
}

#[test]
fn minify_handles_escaped_quotes() {
    let out = minify_js("var s = 'it\\'s // fine'; // gone\n");
    assert_eq!(out, "var s = 'it\\'s // fine';\n");
}

#[test]
fn minify_keeps_regex_literals() {
    let out = minify_js("var a = s.replace(/'/g, \"\");\nvar u = 'http://example.com';\n");
    assert_eq!(out, "var a = s.replace(/'/g, \"\");\nvar u = 'http://example.com';\n");

    let out = minify_js("function f(x) {\n    return /[/\"]+/.test(x); // quote or slash\n}\n");
    assert_eq!(out, "function f(x) {\nreturn /[/\"]+/.test(x);\n}\n");
}

#[test]
fn minify_treats_slash_after_operand_as_division() {
    let out = minify_js("var r = (a) / b / 2; // half\nvar s = 'x//y';\n");
    assert_eq!(out, "var r = (a) / b / 2;\nvar s = 'x//y';\n");
}

#[test]
fn minify_leaves_unterminated_literals_alone() {
    let src = "var s = 'oops\nvar t = 1; // note\n";
    assert_eq!(minify_js(src), src);

    let src = "x = /abc\ny = 2; // note\n";
    assert_eq!(minify_js(src), src);
}

#[tokio::test]
async fn scripts_write_verbose_then_minified_with_tokens() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().slug("acme").build(),
    ));
    let ctx = fixture.context(provider);

    let report = ScriptTask::new().run(&ctx).await?;
    assert_eq!(report.files, 1);
    assert_eq!(report.written, 1);

    // The verbose copy is written before minification and replacement.
    assert_eq!(fixture.read("verbose/assets/js/src/navigation.js"), NAV);

    let out = fixture.read("theme/assets/js/src/navigation.js");
    assert!(out.starts_with("const slug = 'acme';\n"), "{out}");
    assert!(!out.contains("Navigation for"));

    assert!(!fixture.exists("theme/assets/js/vendor.min.js"));
    assert!(!fixture.exists("theme/assets/js/libs/lib.js"));
    Ok(())
}

#[tokio::test]
async fn debug_scripts_keeps_source_layout() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().slug("acme").name("Acme").debug_scripts(true).build(),
    ));
    let ctx = fixture.context(provider);

    ScriptTask::new().run(&ctx).await?;
    let out = fixture.read("theme/assets/js/src/navigation.js");
    assert!(out.contains(" * Navigation for Acme."), "{out}");
    Ok(())
}

#[tokio::test]
async fn incremental_unless_forced() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);

    assert_eq!(ScriptTask::new().run(&ctx).await?.written, 1);

    let again = ScriptTask::new().run(&ctx).await?;
    assert_eq!(again.written, 0);
    assert_eq!(again.skipped, 1);

    let forced = ScriptTask::forced();
    assert!(forced.is_forced());
    assert_eq!(forced.run(&ctx).await?.written, 1);
    Ok(())
}

#[tokio::test]
async fn transpile_command_transforms_contents() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new()
            .debug_scripts(true)
            .script_transpile("sed s/const/var/g")
            .build(),
    ));
    let ctx = fixture.context(provider);

    let report = ScriptTask::new().run(&ctx).await?;
    assert_eq!(report.written, 1);
    let out = fixture.read("theme/assets/js/src/navigation.js");
    assert!(out.contains("var slug = 'wprig';"), "{out}");
    assert!(!out.contains("const"));
    Ok(())
}

#[tokio::test]
async fn failing_transpile_is_a_per_file_error() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().script_transpile("cat >/dev/null; exit 3").build(),
    ));
    let ctx = fixture.context(provider);

    let report = ScriptTask::new().run(&ctx).await?;
    assert_eq!(report.errors, 1);
    assert_eq!(report.written, 0);
    assert!(!fixture.exists("theme/assets/js/src/navigation.js"));
    Ok(())
}

#[tokio::test]
async fn copies_are_verbatim_into_both_trees() -> TestResult {
    init_tracing();
    let fixture = setup();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().slug("acme").build(),
    ));
    let ctx = fixture.context(provider);

    let min = CopyTask::scripts_min();
    assert_eq!(min.name(), "jsMin");
    assert_eq!(min.run(&ctx).await?.written, 1);

    let libs = CopyTask::script_libs();
    assert_eq!(libs.name(), "jsLibs");
    assert_eq!(libs.run(&ctx).await?.written, 1);

    for tree in ["theme", "verbose"] {
        assert_eq!(
            fixture.read(&format!("{tree}/assets/js/vendor.min.js")),
            "var a=1;/* wprig */\n"
        );
        assert_eq!(
            fixture.read(&format!("{tree}/assets/js/libs/lib.js")),
            "// library wprig\nvar lib = 1;\n"
        );
    }

    assert_eq!(libs.run(&ctx).await?.skipped, 1);
    Ok(())
}
