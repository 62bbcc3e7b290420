// src/tasks/css.rs

//! Text-level CSS transforms used by the style task.
//!
//! These work on plain CSS source without building a full syntax tree:
//! custom properties and custom media are resolved the way a
//! "preserve: false" polyfill would, and a fixed table of properties gets
//! vendor-prefixed copies.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::anyhow;
use regex::{Captures, Regex};

/// Nested `var()` references deeper than this are left unresolved.
const MAX_VAR_DEPTH: usize = 8;

static ROOT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":root\s*\{([^}]*)\}").expect("invalid :root regex")
});

static CUSTOM_PROP_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(--[A-Za-z0-9_-]+)\s*:\s*([^;]+);?")
        .expect("invalid custom property regex")
});

static CUSTOM_MEDIA_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@custom-media\s+(--[A-Za-z0-9_-]+)\s+([^;]+);\s*")
        .expect("invalid custom media regex")
});

static MEDIA_PRELUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@media([^{]*)\{").expect("invalid media regex")
});

static MEDIA_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(--[A-Za-z0-9_-]+)\s*\)").expect("invalid media ref regex")
});

/// Properties that get vendor-prefixed copies, with their prefixes.
const PREFIXED: &[(&str, &[&str])] = &[
    ("appearance", &["-webkit-", "-moz-"]),
    ("backdrop-filter", &["-webkit-"]),
    ("hyphens", &["-webkit-", "-ms-"]),
    ("text-size-adjust", &["-webkit-", "-ms-"]),
    ("user-select", &["-webkit-", "-moz-", "-ms-"]),
    ("mask-image", &["-webkit-"]),
    ("text-decoration-skip-ink", &["-webkit-"]),
];

static PREFIX_DECL: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = PREFIXED.iter().map(|(p, _)| *p).collect();
    Regex::new(&format!(
        r"(^|[;{{\s])({})\s*:\s*([^;{{}}]+)",
        names.join("|")
    ))
    .expect("invalid prefix regex")
});

/// Resolve `var(--x)` / `var(--x, fallback)` against `variables` plus the
/// custom properties declared in `:root` blocks of `css` itself (which win),
/// then drop those `:root` declarations.
pub fn resolve_custom_properties(css: &str, variables: &BTreeMap<String, String>) -> String {
    let mut vars = variables.clone();
    for block in ROOT_BLOCK.captures_iter(css) {
        for decl in CUSTOM_PROP_DECL.captures_iter(&block[1]) {
            vars.insert(decl[1].to_string(), decl[2].trim().to_string());
        }
    }

    let stripped = ROOT_BLOCK.replace_all(css, |caps: &Captures| {
        let rest = CUSTOM_PROP_DECL.replace_all(&caps[1], "");
        if rest.trim().is_empty() {
            String::new()
        } else {
            format!(":root {{{}}}", rest)
        }
    });

    substitute_vars(&stripped, &vars, 0)
}

fn substitute_vars(text: &str, vars: &BTreeMap<String, String>, depth: usize) -> String {
    if depth > MAX_VAR_DEPTH {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("var(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 4..];

        let Some(end) = matching_paren(after) else {
            // Unbalanced: keep the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };

        let inner = &after[..end];
        let (name, fallback) = match split_top_level_comma(inner) {
            Some((n, f)) => (n.trim(), Some(f.trim())),
            None => (inner.trim(), None),
        };

        match (vars.get(name), fallback) {
            (Some(value), _) => out.push_str(&substitute_vars(value, vars, depth + 1)),
            (None, Some(fb)) => out.push_str(&substitute_vars(fb, vars, depth + 1)),
            (None, None) => {
                out.push_str("var(");
                out.push_str(inner);
                out.push(')');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Index of the `)` closing a group whose `(` was just consumed.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(idx),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn split_top_level_comma(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some((&s[..idx], &s[idx + 1..])),
            _ => {}
        }
    }
    None
}

/// Replace `(--name)` references in `@media` preludes with their
/// definitions from `@custom-media` rules in `css` (which win) and
/// `queries`, and drop the `@custom-media` rules.
pub fn resolve_custom_media(css: &str, queries: &BTreeMap<String, String>) -> String {
    let mut defs = queries.clone();
    for def in CUSTOM_MEDIA_DEF.captures_iter(css) {
        defs.insert(def[1].to_string(), def[2].trim().to_string());
    }

    let stripped = CUSTOM_MEDIA_DEF.replace_all(css, "");

    MEDIA_PRELUDE
        .replace_all(&stripped, |caps: &Captures| {
            let prelude = MEDIA_REF.replace_all(&caps[1], |r: &Captures| match defs.get(&r[1]) {
                Some(query) => query.clone(),
                None => r[0].to_string(),
            });
            format!("@media{}{{", prelude)
        })
        .into_owned()
}

/// Add vendor-prefixed copies of the declarations listed in the prefix
/// table, ahead of the standard declaration. The terminating `;` or `}` is
/// left in place, so adjacent declarations are each seen.
pub fn add_vendor_prefixes(css: &str) -> String {
    PREFIX_DECL
        .replace_all(css, |caps: &Captures| {
            let lead = &caps[1];
            let prop = &caps[2];
            let value = caps[3].trim();

            let prefixes = PREFIXED
                .iter()
                .find(|(p, _)| *p == prop)
                .map(|(_, prefixes)| *prefixes)
                .unwrap_or(&[]);

            let mut out = String::from(lead);
            for prefix in prefixes {
                out.push_str(&format!("{prefix}{prop}: {value}; "));
            }
            out.push_str(&format!("{prop}: {value}"));
            out
        })
        .into_owned()
}

/// Minify CSS by running it through the Sass compiler in compressed mode.
pub fn minify_css(css: &str) -> anyhow::Result<String> {
    let options = grass::Options::default().style(grass::OutputStyle::Compressed);
    grass::from_string(css.to_string(), &options).map_err(|e| anyhow!("minifying CSS: {e}"))
}
