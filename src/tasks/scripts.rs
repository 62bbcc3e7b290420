// src/tasks/scripts.rs

use tracing::debug;

use crate::config::ThemeConfig;
use crate::pipeline::stages::{Branch, External, Lint, Map, Newer, ReplaceTokens, WriteTo};
use crate::pipeline::{Pipeline, Source};
use crate::tasks::lint::ScriptLinter;
use crate::tasks::{Task, TaskContext, TaskFuture, TaskReport};

/// Words after which a `/` starts a regular expression rather than a
/// division.
const KEYWORDS_BEFORE_EXPRESSION: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

/// Strip comments and indentation from JavaScript.
///
/// Conservative on purpose: line breaks are kept so automatic semicolon
/// insertion behaves exactly as in the source, and nothing inside string,
/// template or regular expression literals is touched. When the scan cannot
/// tell where a literal ends (an unterminated string, a regex broken by a
/// newline) the source is returned unchanged.
pub fn minify_js(src: &str) -> String {
    match strip_js_comments(src) {
        Some(stripped) => squeeze_lines(&stripped),
        None => {
            debug!("ambiguous script literal; leaving source unminified");
            src.to_string()
        }
    }
}

fn strip_js_comments(src: &str) -> Option<String> {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut word = String::new();
    // Whether the last token ends an operand, making a following `/` a
    // division.
    let mut after_value = false;

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                out.push(c);
                scan_string(c, &mut chars, &mut out)?;
                word.clear();
                after_value = true;
            }
            '/' if chars.peek() == Some(&'/') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = '\0';
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                    }
                    if last == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    last = inner;
                }
                if !closed {
                    return None;
                }
                out.push(' ');
            }
            '/' if !after_value => {
                out.push(c);
                scan_regex(&mut chars, &mut out)?;
                word.clear();
                after_value = true;
            }
            c if c.is_whitespace() => {
                out.push(c);
                word.clear();
            }
            c => {
                out.push(c);
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    word.push(c);
                    after_value = !KEYWORDS_BEFORE_EXPRESSION.contains(&word.as_str());
                } else {
                    word.clear();
                    after_value = matches!(c, ')' | ']');
                }
            }
        }
    }
    Some(out)
}

/// Copy a string or template literal up to and including its closing quote.
fn scan_string(
    quote: char,
    chars: &mut impl Iterator<Item = char>,
    out: &mut String,
) -> Option<()> {
    let mut escaped = false;
    for c in chars {
        out.push(c);
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' if quote != '`' => return None,
            c if c == quote => return Some(()),
            _ => {}
        }
    }
    None
}

/// Copy a regular expression body up to and including its closing `/`.
/// A `/` inside a `[...]` class does not close it.
fn scan_regex(chars: &mut impl Iterator<Item = char>, out: &mut String) -> Option<()> {
    let mut escaped = false;
    let mut in_class = false;
    for c in chars {
        out.push(c);
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' => return None,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Some(()),
            _ => {}
        }
    }
    None
}

fn squeeze_lines(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Lint, transpile and minify scripts.
///
/// Incremental by default; a forced instance processes every file, which
/// the distribution graph relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptTask {
    force: bool,
}

impl ScriptTask {
    pub const NAME: &'static str = "scripts";

    pub fn new() -> Self {
        Self { force: false }
    }

    pub fn forced() -> Self {
        Self { force: true }
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    fn pipeline(&self, ctx: &TaskContext, config: &ThemeConfig) -> Pipeline {
        let spec = &ctx.paths.scripts;

        let mut pipeline = Pipeline::new(Self::NAME)
            .stage(Branch::when("newer", !self.force, Newer::new(&spec.dest)))
            .stage(Lint::new(ScriptLinter));

        if let Some(cmd) = &config.tools.script_lint {
            pipeline = pipeline.stage(External::advisory("eslint", cmd));
        }
        if let Some(cmd) = &config.tools.script_transpile {
            pipeline = pipeline.stage(External::transform("babel", cmd));
        }
        if let Some(verbose) = &spec.verbose_dest {
            pipeline = pipeline.stage(WriteTo::new(Self::NAME, verbose, ctx.claims.clone()));
        }

        let minify = Map::text("uglify", |js| Ok(minify_js(js)));

        pipeline
            .stage(Branch::when("minify", !config.debug.scripts, minify))
            .stage(ReplaceTokens::new(&config.slug, &config.name))
            .stage(WriteTo::new(Self::NAME, &spec.dest, ctx.claims.clone()))
            .output_roots_from(spec)
    }
}

impl Task for ScriptTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move {
            let config = ctx.config.load()?;
            let source = Source::from_spec(&ctx.paths.root, &ctx.paths.scripts)?;
            let report = self.pipeline(ctx, &config).run(&source).await?;
            Ok(TaskReport::from(report))
        })
    }
}
