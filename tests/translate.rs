use std::error::Error;
use std::sync::Arc;

use rigbuild::tasks::translate::Catalog;
use rigbuild::tasks::{Task, TranslateTask};
use rigbuild_test_utils::{MemoryConfigProvider, ThemeConfigBuilder, ThemeFixture, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

const FUNCTIONS: &str = r#"<?php
echo __( 'Hello', 'acme' );
_e( "Say \"hi\"", 'acme' );
echo _x( 'Post', 'noun', 'acme' );
printf( _n( '%s item', '%s items', $count, 'acme' ), $count );
echo __( 'Hello', 'acme' );
echo __( $dynamic, 'acme' );
echo __( 'Joined ' . $name, 'acme' );
"#;

#[test]
fn extracts_known_call_shapes() {
    let mut catalog = Catalog::new();
    catalog.extract("functions.php", FUNCTIONS);
    catalog.extract(
        "inc/template.php",
        "<?php\nesc_html_e( 'Hello', 'acme' );\nesc_attr_x( 'Post', 'verb', 'acme' );\n",
    );

    let entries: Vec<_> = catalog.entries().collect();
    let keys: Vec<(Option<&str>, &str)> = entries
        .iter()
        .map(|e| (e.context.as_deref(), e.msgid.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (None, "%s item"),
            (None, "Hello"),
            (None, "Say \"hi\""),
            (Some("noun"), "Post"),
            (Some("verb"), "Post"),
        ]
    );

    let hello = entries.iter().find(|e| e.msgid == "Hello").unwrap();
    assert_eq!(
        hello.references,
        vec!["functions.php:2", "functions.php:6", "inc/template.php:2"]
    );

    let item = entries.iter().find(|e| e.msgid == "%s item").unwrap();
    assert_eq!(item.plural.as_deref(), Some("%s items"));
}

#[test]
fn render_has_header_and_plural_forms() {
    let config = ThemeConfigBuilder::new()
        .slug("acme")
        .name("Acme Theme")
        .author("Acme Inc")
        .build();
    let mut catalog = Catalog::new();
    catalog.extract("functions.php", FUNCTIONS);

    let pot = catalog.render(&config);
    assert!(pot.contains("\"Project-Id-Version: Acme Theme\\n\""), "{pot}");
    assert!(pot.contains("\"Report-Msgid-Bugs-To: Acme Theme\\n\""));
    assert!(pot.contains("\"Last-Translator: Acme Inc\\n\""));
    assert!(pot.contains("\"X-Domain: Acme Theme\\n\""));
    assert!(pot.contains("msgid \"%s item\"\nmsgid_plural \"%s items\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n"));
    assert!(pot.contains("msgctxt \"noun\"\nmsgid \"Post\"\nmsgstr \"\"\n"));
    assert!(pot.contains("msgid \"Say \\\"hi\\\"\""));
}

#[tokio::test]
async fn task_writes_pot_named_after_slug() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    fixture.write("theme/functions.php", FUNCTIONS);
    fixture.write("theme/style.css", "/* __( 'Not PHP' ) */");
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().slug("acme").name("Acme").build(),
    ));
    let ctx = fixture.context(provider);

    let report = TranslateTask.run(&ctx).await?;
    assert_eq!(report.files, 1);
    assert_eq!(report.written, 1);

    let pot = fixture.read("theme/languages/acme.pot");
    assert!(pot.contains("#: functions.php:2 functions.php:6\nmsgid \"Hello\""), "{pot}");
    assert!(!pot.contains("Not PHP"));
    Ok(())
}

#[tokio::test]
async fn missing_built_theme_is_a_source_error() {
    init_tracing();
    let fixture = ThemeFixture::new();
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);

    let err = TranslateTask.run(&ctx).await.unwrap_err();
    assert!(matches!(err, rigbuild::errors::RigError::SourceRoot { .. }), "{err:?}");
}
