// src/paths.rs

//! Mapping from asset categories to source globs and destination trees.
//!
//! Everything is derived from a single root directory:
//!
//! ```text
//! <root>/dev/       sources (php, css, scss, js, images, config)
//! <root>/theme/     final destination tree (what gets exported)
//! <root>/verbose/   unminified mirror of the build output
//! <root>/export/    packaged theme (zip or raw directory)
//! ```
//!
//! The verbose tree lives outside the final tree so it can never leak into
//! an export.

use std::path::{Path, PathBuf};

use crate::types::AssetCategory;

pub const SOURCE_DIR: &str = "dev";
pub const FINAL_DIR: &str = "theme";
pub const VERBOSE_DIR: &str = "verbose";
pub const EXPORT_DIR: &str = "export";

/// Source globs and destinations for one asset category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub category: AssetCategory,
    /// Directory that source-relative paths are computed against.
    pub base: PathBuf,
    /// Include globs, relative to the root.
    pub include: Vec<String>,
    /// Exclude globs, relative to the root.
    pub exclude: Vec<String>,
    /// Final destination directory.
    pub dest: PathBuf,
    /// Verbose mirror directory, if this category writes one.
    pub verbose_dest: Option<PathBuf>,
}

impl PathSpec {
    fn new(
        category: AssetCategory,
        base: PathBuf,
        include: &[&str],
        exclude: &[&str],
        dest: PathBuf,
        verbose_dest: Option<PathBuf>,
    ) -> Self {
        Self {
            category,
            base,
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            dest,
            verbose_dest,
        }
    }

    /// All directories this category writes into.
    pub fn output_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.dest.clone()];
        if let Some(v) = &self.verbose_dest {
            roots.push(v.clone());
        }
        roots
    }
}

/// Immutable path layout for a theme project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    pub root: PathBuf,
    pub final_root: PathBuf,
    pub verbose_root: PathBuf,
    pub export_root: PathBuf,
    pub theme_config: PathBuf,
    pub style_variables: PathBuf,

    pub php: PathSpec,
    pub styles: PathSpec,
    pub sass: PathSpec,
    pub scripts: PathSpec,
    pub script_libs: PathSpec,
    pub scripts_min: PathSpec,
    pub images: PathSpec,
    pub languages: PathSpec,
    pub export: PathSpec,
}

impl PathSet {
    /// Derive the layout from a project root. Pure; never touches the disk.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let src = root.join(SOURCE_DIR);
        let final_root = root.join(FINAL_DIR);
        let verbose_root = root.join(VERBOSE_DIR);
        let export_root = root.join(EXPORT_DIR);

        let php = PathSpec::new(
            AssetCategory::Php,
            src.clone(),
            &["dev/**/*.php"],
            &["dev/optional/**", "dev/tests/**", "dev/config/**"],
            final_root.clone(),
            Some(verbose_root.clone()),
        );

        let styles = PathSpec::new(
            AssetCategory::Styles,
            src.clone(),
            &["dev/**/*.css"],
            &["dev/optional/**", "dev/config/**"],
            final_root.clone(),
            Some(verbose_root.clone()),
        );

        // Sass output goes straight back into the source tree, where the
        // style task picks it up on its next run.
        let sass = PathSpec::new(
            AssetCategory::Sass,
            src.clone(),
            &["dev/**/*.scss"],
            &["dev/**/_*.scss"],
            src.clone(),
            None,
        );

        let scripts = PathSpec::new(
            AssetCategory::Scripts,
            src.clone(),
            &["dev/assets/js/**/*.js"],
            &["dev/**/*.min.js", "dev/assets/js/libs/**"],
            final_root.clone(),
            Some(verbose_root.clone()),
        );

        let scripts_min = PathSpec::new(
            AssetCategory::ScriptsMin,
            src.clone(),
            &["dev/assets/js/**/*.min.js"],
            &["dev/assets/js/libs/**"],
            final_root.clone(),
            Some(verbose_root.clone()),
        );

        let script_libs = PathSpec::new(
            AssetCategory::ScriptLibs,
            src.clone(),
            &["dev/assets/js/libs/**/*"],
            &[],
            final_root.clone(),
            Some(verbose_root.clone()),
        );

        let images = PathSpec::new(
            AssetCategory::Images,
            src.clone(),
            &["dev/assets/images/**/*.{png,jpg,jpeg,gif,svg,webp}"],
            &[],
            final_root.clone(),
            None,
        );

        let languages = PathSpec::new(
            AssetCategory::Languages,
            final_root.clone(),
            &["theme/**/*.php"],
            &[],
            final_root.join("languages"),
            None,
        );

        let export = PathSpec::new(
            AssetCategory::Export,
            final_root.clone(),
            &["theme/**/*"],
            &[],
            export_root.clone(),
            None,
        );

        Self {
            theme_config: src.join("config").join("theme.toml"),
            style_variables: src.join("config").join("css-variables.toml"),
            root,
            final_root,
            verbose_root,
            export_root,
            php,
            styles,
            sass,
            scripts,
            script_libs,
            scripts_min,
            images,
            languages,
            export,
        }
    }

    /// Look up the spec for a category.
    pub fn spec(&self, category: AssetCategory) -> &PathSpec {
        match category {
            AssetCategory::Php => &self.php,
            AssetCategory::Styles => &self.styles,
            AssetCategory::Sass => &self.sass,
            AssetCategory::Scripts => &self.scripts,
            AssetCategory::ScriptLibs => &self.script_libs,
            AssetCategory::ScriptsMin => &self.scripts_min,
            AssetCategory::Images => &self.images,
            AssetCategory::Languages => &self.languages,
            AssetCategory::Export => &self.export,
        }
    }

    /// Path of `file` relative to the root, with forward slashes.
    pub fn relative_to_root(&self, file: &Path) -> Option<String> {
        crate::watch::path_utils::relative_str(&self.root, file)
    }
}
