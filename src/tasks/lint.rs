// src/tasks/lint.rs

//! Built-in advisory linters.
//!
//! These are deliberately cheap line-based checks. Their findings are
//! logged by the [`Lint`](crate::pipeline::stages::Lint) stage and never stop
//! a file; a project that wants a real rule set configures an external tool
//! under `[tools]`.

use crate::pipeline::FileUnit;
use crate::pipeline::stages::{LintFinding, Linter};

/// Checks shared by every linter: trailing whitespace.
fn trailing_whitespace(text: &str, findings: &mut Vec<LintFinding>) {
    for (idx, line) in text.lines().enumerate() {
        if line.ends_with(' ') || line.ends_with('\t') {
            findings.push(LintFinding::new(idx + 1, "trailing whitespace"));
        }
    }
}

/// Count `open`/`close` outside string literals and comments, reporting
/// each unmatched closer and the number of unclosed openers.
///
/// `line_comments` enables `//` comments, which CSS does not have (and where
/// `//` shows up inside unquoted URLs).
fn balance(
    text: &str,
    open: char,
    close: char,
    line_comments: bool,
    findings: &mut Vec<LintFinding>,
) {
    let mut depth: i64 = 0;
    let mut line = 1;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    let mut prev = '\0';

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if let Some(q) = quote {
            if c == q && prev != '\\' {
                quote = None;
            }
            prev = if prev == '\\' && c == '\\' { '\0' } else { c };
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '/' if chars.peek() == Some(&'*') => {
                // Skip block comment.
                chars.next();
                let mut last = '\0';
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        line += 1;
                    }
                    if last == '*' && inner == '/' {
                        break;
                    }
                    last = inner;
                }
            }
            '/' if line_comments && chars.peek() == Some(&'/') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth < 0 {
                    findings.push(LintFinding::new(line, format!("unmatched '{close}'")));
                    depth = 0;
                }
            }
            _ => {}
        }
        prev = c;
    }

    if depth > 0 {
        findings.push(LintFinding::new(0, format!("{depth} unclosed '{open}'")));
    }
}

/// PHP sources: open tag, balanced delimiters, tab indentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpLinter;

impl Linter for PhpLinter {
    fn name(&self) -> &str {
        "php-lint"
    }

    fn check(&self, unit: &FileUnit) -> Vec<LintFinding> {
        let text = match unit.text() {
            Ok(t) => t,
            Err(_) => return vec![LintFinding::new(0, "file is not valid UTF-8")],
        };
        let mut findings = Vec::new();

        if !text.trim_start().starts_with("<?php") {
            findings.push(LintFinding::new(1, "missing '<?php' open tag"));
        }
        trailing_whitespace(text, &mut findings);
        for (idx, line) in text.lines().enumerate() {
            // WordPress coding standards indent with tabs; docblock
            // continuation lines (" *") are the exception.
            if line.starts_with("  ") && !line.trim_start().starts_with('*') {
                findings.push(LintFinding::new(idx + 1, "spaces used for indentation"));
            }
        }
        balance(text, '{', '}', true, &mut findings);
        balance(text, '(', ')', true, &mut findings);
        findings
    }
}

/// Style sources: balanced braces, `!important`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleLinter;

impl Linter for StyleLinter {
    fn name(&self) -> &str {
        "style-lint"
    }

    fn check(&self, unit: &FileUnit) -> Vec<LintFinding> {
        let text = match unit.text() {
            Ok(t) => t,
            Err(_) => return vec![LintFinding::new(0, "file is not valid UTF-8")],
        };
        let mut findings = Vec::new();

        trailing_whitespace(text, &mut findings);
        for (idx, line) in text.lines().enumerate() {
            if line.contains("!important") {
                findings.push(LintFinding::new(idx + 1, "avoid !important"));
            }
        }
        balance(text, '{', '}', false, &mut findings);
        findings
    }
}

/// Script sources: `debugger`, `console.log`, `var`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLinter;

impl Linter for ScriptLinter {
    fn name(&self) -> &str {
        "script-lint"
    }

    fn check(&self, unit: &FileUnit) -> Vec<LintFinding> {
        let text = match unit.text() {
            Ok(t) => t,
            Err(_) => return vec![LintFinding::new(0, "file is not valid UTF-8")],
        };
        let mut findings = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let code = line.trim_start();
            if code.starts_with("//") {
                continue;
            }
            if code.starts_with("debugger") {
                findings.push(LintFinding::new(idx + 1, "unexpected 'debugger' statement"));
            }
            if code.contains("console.log(") {
                findings.push(LintFinding::new(idx + 1, "unexpected console.log"));
            }
            if code.starts_with("var ") {
                findings.push(LintFinding::new(idx + 1, "use 'let' or 'const' instead of 'var'"));
            }
        }
        balance(text, '{', '}', true, &mut findings);
        balance(text, '(', ')', true, &mut findings);
        findings
    }
}
