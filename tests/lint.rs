use rigbuild::pipeline::FileUnit;
use rigbuild::pipeline::stages::Linter;
use rigbuild::tasks::lint::{PhpLinter, ScriptLinter, StyleLinter};

fn findings(linter: &dyn Linter, name: &str, text: &str) -> Vec<(usize, String)> {
    let unit = FileUnit::new(format!("/src/{name}"), name, text.as_bytes().to_vec());
    linter
        .check(&unit)
        .into_iter()
        .map(|f| (f.line, f.message))
        .collect()
}

#[test]
fn clean_php_has_no_findings() {
    let php = "<?php\n/**\n * Setup.\n */\nfunction wprig_setup() {\n\t$a = '{';\n\t// }\n\treturn array( 1 );\n}\n";
    assert!(findings(&PhpLinter, "functions.php", php).is_empty());
}

#[test]
fn php_rules() {
    assert_eq!(
        findings(&PhpLinter, "a.php", "echo 1;\n"),
        vec![(1, "missing '<?php' open tag".to_string())]
    );
    assert_eq!(
        findings(&PhpLinter, "a.php", "<?php\nfunction a() {\n  return 1; \n"),
        vec![
            (3, "trailing whitespace".to_string()),
            (3, "spaces used for indentation".to_string()),
            (0, "1 unclosed '{'".to_string()),
        ]
    );
    assert_eq!(
        findings(&PhpLinter, "a.php", "<?php\n}\n"),
        vec![(2, "unmatched '}'".to_string())]
    );
}

#[test]
fn style_rules() {
    let css = "a { background: url(http://example.com/x.png); }\nb { color: red !important; }\n";
    assert_eq!(
        findings(&StyleLinter, "style.css", css),
        vec![(2, "avoid !important".to_string())]
    );
    assert_eq!(
        findings(&StyleLinter, "style.css", "a {\n/* } */\n"),
        vec![(0, "1 unclosed '{'".to_string())]
    );
}

#[test]
fn script_rules() {
    let js = "debugger;\nconsole.log(x);\nvar a = 1;\n// var b = console.log(2);\nconst s = \"(\";\n";
    assert_eq!(
        findings(&ScriptLinter, "nav.js", js),
        vec![
            (1, "unexpected 'debugger' statement".to_string()),
            (2, "unexpected console.log".to_string()),
            (3, "use 'let' or 'const' instead of 'var'".to_string()),
        ]
    );
}

#[test]
fn binary_input_is_reported_once() {
    let unit = FileUnit::new("/src/a.js", "a.js", vec![0xff, 0xfe, 0x00]);
    let out = ScriptLinter.check(&unit);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].line, 0);
}
