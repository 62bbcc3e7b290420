// src/tasks/translate.rs

//! Translation catalog template (`.pot`) generation.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tracing::info;

use crate::config::ThemeConfig;
use crate::pipeline::{FileUnit, Pipeline, Source};
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

static GETTEXT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(_n_noop|_nx|_n|_ex|_x|_e|__|esc_html__|esc_html_e|esc_html_x|esc_attr__|esc_attr_e|esc_attr_x)\s*\(",
    )
    .expect("invalid gettext regex")
});

/// Which argument positions hold what, per gettext function.
#[derive(Debug, Clone, Copy)]
struct Shape {
    msgid: usize,
    plural: Option<usize>,
    context: Option<usize>,
}

fn shape_of(function: &str) -> Option<Shape> {
    let shape = match function {
        "__" | "_e" | "esc_html__" | "esc_html_e" | "esc_attr__" | "esc_attr_e" => Shape {
            msgid: 0,
            plural: None,
            context: None,
        },
        "_x" | "_ex" | "esc_html_x" | "esc_attr_x" => Shape {
            msgid: 0,
            plural: None,
            context: Some(1),
        },
        "_n" | "_n_noop" => Shape {
            msgid: 0,
            plural: Some(1),
            context: None,
        },
        "_nx" => Shape {
            msgid: 0,
            plural: Some(1),
            context: Some(3),
        },
        _ => return None,
    };
    Some(shape)
}

/// One translatable string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub context: Option<String>,
    pub msgid: String,
    pub plural: Option<String>,
    /// `file:line` references, in discovery order.
    pub references: Vec<String>,
}

/// Translatable strings keyed (and therefore sorted) by context, then msgid.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<(String, String), CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Scan PHP source for gettext calls. `file` is used in references.
    pub fn extract(&mut self, file: &str, source: &str) {
        for caps in GETTEXT_CALL.captures_iter(source) {
            let (Some(func), Some(whole)) = (caps.get(1), caps.get(0)) else {
                continue;
            };
            let Some(shape) = shape_of(func.as_str()) else {
                continue;
            };

            let args = parse_args(&source[whole.end()..]);
            let Some(Some(msgid)) = args.get(shape.msgid).cloned() else {
                continue;
            };
            let plural = shape.plural.and_then(|i| args.get(i).cloned().flatten());
            let context = shape.context.and_then(|i| args.get(i).cloned().flatten());

            let line = source[..whole.start()].matches('\n').count() + 1;
            let reference = format!("{file}:{line}");

            let key = (context.clone().unwrap_or_default(), msgid.clone());
            let entry = self.entries.entry(key).or_insert_with(|| CatalogEntry {
                context,
                msgid,
                plural: None,
                references: Vec::new(),
            });
            if entry.plural.is_none() {
                entry.plural = plural;
            }
            if !entry.references.contains(&reference) {
                entry.references.push(reference);
            }
        }
    }

    /// Render as a `.pot` file with a header built from the theme config.
    pub fn render(&self, config: &ThemeConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Copyright (C) {}", config.author);
        let _ = writeln!(out, "# This file is distributed under the same license as {}.", config.name);
        out.push_str("msgid \"\"\nmsgstr \"\"\n");
        for (key, value) in [
            ("Project-Id-Version", config.name.as_str()),
            ("Report-Msgid-Bugs-To", config.name.as_str()),
            ("Last-Translator", config.author.as_str()),
            ("Language-Team", ""),
            ("MIME-Version", "1.0"),
            ("Content-Type", "text/plain; charset=UTF-8"),
            ("Content-Transfer-Encoding", "8bit"),
            ("X-Domain", config.name.as_str()),
        ] {
            let _ = writeln!(out, "\"{}: {}\\n\"", key, escape_po(value));
        }

        for entry in self.entries.values() {
            out.push('\n');
            let _ = writeln!(out, "#: {}", entry.references.join(" "));
            if let Some(ctx) = &entry.context {
                let _ = writeln!(out, "msgctxt \"{}\"", escape_po(ctx));
            }
            let _ = writeln!(out, "msgid \"{}\"", escape_po(&entry.msgid));
            match &entry.plural {
                Some(plural) => {
                    let _ = writeln!(out, "msgid_plural \"{}\"", escape_po(plural));
                    out.push_str("msgstr[0] \"\"\nmsgstr[1] \"\"\n");
                }
                None => out.push_str("msgstr \"\"\n"),
            }
        }
        out
    }
}

fn escape_po(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

/// Parse call arguments after the opening parenthesis. String literal
/// arguments come back as `Some`, anything else as `None`.
fn parse_args(src: &str) -> Vec<Option<String>> {
    let mut args = Vec::new();
    let mut chars = src.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            return args;
        };
        if first == ')' {
            return args;
        }

        let mut literal = None;
        if first == '\'' || first == '"' {
            chars.next();
            literal = Some(read_php_string(&mut chars, first));
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            // A concatenation or other expression makes this a non-literal.
            if !matches!(chars.peek(), Some(',') | Some(')')) {
                literal = None;
            }
        }

        // Skip the rest of this argument.
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut prev = '\0';
        loop {
            let Some(&c) = chars.peek() else {
                args.push(literal);
                return args;
            };
            if let Some(q) = quote {
                if c == q && prev != '\\' {
                    quote = None;
                }
            } else {
                match c {
                    '\'' | '"' => quote = Some(c),
                    '(' | '[' => depth += 1,
                    ')' | ']' if depth > 0 => depth -= 1,
                    ')' => {
                        args.push(literal);
                        return args;
                    }
                    ',' if depth == 0 => {
                        chars.next();
                        break;
                    }
                    _ => {}
                }
            }
            prev = if prev == '\\' && c == '\\' { '\0' } else { c };
            chars.next();
        }
        args.push(literal);
    }
}

fn read_php_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        if c == quote {
            break;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match (quote, next) {
            (_, '\\') => out.push('\\'),
            (q, n) if n == q => out.push(n),
            ('"', 'n') => out.push('\n'),
            ('"', 't') => out.push('\t'),
            ('"', '$') => out.push('$'),
            (_, n) => {
                out.push('\\');
                out.push(n);
            }
        }
    }
    out
}

/// Extract translatable strings from the built theme into
/// `languages/<slug>.pot`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranslateTask;

impl TranslateTask {
    pub const NAME: &'static str = "translate";

    pub fn catalog_path(ctx: &TaskContext, config: &ThemeConfig) -> PathBuf {
        ctx.paths.languages.dest.join(format!("{}.pot", config.slug))
    }
}

impl Task for TranslateTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let spec = &ctx.paths.languages;
            let source = Source::from_spec(&ctx.paths.root, spec)?;

            let collected = Pipeline::new(Self::NAME)
                .output_root(&spec.dest)
                .collect_output()
                .run(&source)
                .await?;

            let mut catalog = Catalog::new();
            let mut errors = collected.errors;
            let mut units: Vec<&FileUnit> = collected.output.iter().collect();
            units.sort_by(|a, b| a.relative.cmp(&b.relative));
            for unit in units {
                let file = unit.relative.to_string_lossy().replace('\\', "/");
                match unit.text() {
                    Ok(text) => catalog.extract(&file, text),
                    Err(err) => {
                        tracing::warn!(task = Self::NAME, file = %file, error = %err, "skipping file");
                        errors += 1;
                    }
                }
            }

            let path = Self::catalog_path(ctx, &config);
            ctx.claims.claim(&path, Self::NAME)?;
            tokio::fs::write(&path, catalog.render(&config))
                .await
                .with_context(|| format!("writing {:?}", path))?;

            info!(task = Self::NAME, strings = catalog.len(), path = %path.display(), "wrote translation template");

            Ok(TaskReport {
                files: collected.matched,
                written: 1,
                skipped: 0,
                errors,
            })
        })
    }
}
