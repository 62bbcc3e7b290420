// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::paths::PathSpec;
use crate::watch::path_utils::relative_str;

/// Compiled include/exclude glob patterns.
///
/// The patterns are relative to the project root; callers pass relative
/// paths with forward slashes (e.g. `"dev/inc/assets.php"`) into `matches`.
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
    patterns: Vec<String>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile a pattern set from include and exclude lists.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
            patterns: include.to_vec(),
        })
    }

    /// Compile the source patterns of a path spec.
    pub fn from_spec(spec: &PathSpec) -> Result<Self> {
        Self::new(&spec.include, &spec.exclude)
            .with_context(|| format!("compiling source globs for {}", spec.category.as_str()))
    }

    /// Match exactly one file (e.g. the theme config file).
    pub fn single(rel_path: &str) -> Result<Self> {
        Self::new(&[rel_path.to_string()], &[])
    }

    /// Include patterns, for display.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if the given root-relative path is included and not
    /// excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns. `*` never crosses a `/`.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `base` whose root-relative path matches `set`.
/// `root` and `base` may be spelled differently (`.` against an absolute
/// path); matching falls back to canonical paths.
///
/// The walk itself propagates I/O errors: an unreadable base directory is
/// the caller's problem to report. Results are sorted so runs are
/// deterministic.
pub fn collect_matching_files(
    root: &Path,
    base: &Path,
    set: &PatternSet,
) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![base.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                if let Some(rel_str) = relative_str(root, &path) {
                    if set.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
