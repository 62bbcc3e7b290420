// src/engine/composer.rs

//! Named graphs and watch bindings.

use std::sync::Arc;

use clap::ValueEnum;

use crate::errors::{Result, RigError};
use crate::paths::PathSet;
use crate::preview::{PreviewService, ReloadTask, ServeTask};
use crate::tasks::{
    CopyTask, ImageTask, PackageTask, PhpTask, SassTask, ScriptTask, StyleTask, TranslateTask,
};
use crate::watch::{PatternSet, WatchBinding, WatchTask};

use super::graph::TaskGraph;

/// Entry points selectable on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "camelCase")]
pub enum TaskTarget {
    /// Full first run: build everything, start the preview, then watch.
    #[default]
    Default,
    Php,
    Styles,
    SassStyles,
    Scripts,
    JsLibs,
    JsMin,
    Images,
    Watch,
    Translate,
    Bundle,
    TestTheme,
    /// Distribution build ending in the packaged theme.
    BundleTheme,
}

/// Builds graphs out of shared task instances.
///
/// The PHP task is shared by every graph so its rebuild tracker sees every
/// run in the process. The preview service is shared so that `serve` and
/// every `reload` talk to the same server.
#[derive(Debug, Clone)]
pub struct Composer {
    paths: Arc<PathSet>,
    preview: Arc<PreviewService>,
    php: Arc<PhpTask>,
}

impl Composer {
    pub fn new(paths: Arc<PathSet>, preview: Arc<PreviewService>) -> Self {
        Self {
            paths,
            preview,
            php: Arc::new(PhpTask::new()),
        }
    }

    pub fn preview(&self) -> &Arc<PreviewService> {
        &self.preview
    }

    pub fn php_task(&self) -> &Arc<PhpTask> {
        &self.php
    }

    fn php(&self) -> TaskGraph {
        TaskGraph::shared(self.php.clone())
    }

    fn reload(&self) -> TaskGraph {
        TaskGraph::task(ReloadTask::new(Arc::clone(&self.preview)))
    }

    fn then_reload(&self, graph: TaskGraph) -> TaskGraph {
        TaskGraph::sequence([graph, self.reload()])
    }

    fn all_scripts(&self, scripts: ScriptTask) -> TaskGraph {
        TaskGraph::parallel([
            TaskGraph::task(scripts),
            TaskGraph::task(CopyTask::scripts_min()),
            TaskGraph::task(CopyTask::script_libs()),
        ])
    }

    /// php, scripts in parallel, sass, styles, images, serve, watch.
    pub fn first_run(&self) -> Result<TaskGraph> {
        Ok(TaskGraph::sequence([
            self.php(),
            self.all_scripts(ScriptTask::new()),
            TaskGraph::task(SassTask),
            TaskGraph::task(StyleTask),
            TaskGraph::task(ImageTask),
            TaskGraph::task(ServeTask::new(Arc::clone(&self.preview))),
            TaskGraph::task(WatchTask::new(self.watch_bindings()?)),
        ]))
    }

    /// Complete build ending in the packaged theme. Scripts are forced so
    /// the bundle never depends on what an earlier run left behind.
    pub fn distribution(&self) -> TaskGraph {
        TaskGraph::sequence([
            self.php(),
            self.all_scripts(ScriptTask::forced()),
            TaskGraph::task(StyleTask),
            TaskGraph::task(ImageTask),
            TaskGraph::task(TranslateTask),
            TaskGraph::task(PackageTask),
        ])
    }

    pub fn for_target(&self, target: TaskTarget) -> Result<TaskGraph> {
        let graph = match target {
            TaskTarget::Default => self.first_run()?,
            TaskTarget::Php => self.php(),
            TaskTarget::Styles => TaskGraph::task(StyleTask),
            TaskTarget::SassStyles => TaskGraph::task(SassTask),
            TaskTarget::Scripts => TaskGraph::task(ScriptTask::new()),
            TaskTarget::JsLibs => TaskGraph::task(CopyTask::script_libs()),
            TaskTarget::JsMin => TaskGraph::task(CopyTask::scripts_min()),
            TaskTarget::Images => TaskGraph::task(ImageTask),
            TaskTarget::Watch => TaskGraph::task(WatchTask::new(self.watch_bindings()?)),
            TaskTarget::Translate => TaskGraph::task(TranslateTask),
            TaskTarget::Bundle => TaskGraph::task(PackageTask),
            TaskTarget::TestTheme => TaskGraph::sequence([self.php()]),
            TaskTarget::BundleTheme => self.distribution(),
        };
        Ok(graph)
    }

    /// One binding per watched source set, each running the smallest graph
    /// that refreshes its output. Sass output lands back in the source tree
    /// and is picked up by the style binding, so sass itself does not reload.
    pub fn watch_bindings(&self) -> Result<Vec<WatchBinding>> {
        let paths = &self.paths;

        let from_spec = |name: &str, spec: &crate::paths::PathSpec, graph: TaskGraph| {
            Ok::<_, RigError>(WatchBinding::new(
                name,
                &spec.base,
                PatternSet::from_spec(spec)?,
                graph,
            ))
        };
        let single_file = |name: &str, file: &std::path::Path, graph: TaskGraph| {
            let rel = paths.relative_to_root(file).ok_or_else(|| {
                RigError::ConfigError(format!("{file:?} is outside the project root"))
            })?;
            let base = file.parent().unwrap_or(&paths.root);
            Ok::<_, RigError>(WatchBinding::new(name, base, PatternSet::single(&rel)?, graph))
        };

        Ok(vec![
            from_spec("php", &paths.php, self.then_reload(self.php()))?,
            single_file(
                "themeConfig",
                &paths.theme_config,
                self.then_reload(self.php()),
            )?,
            single_file(
                "styleVariables",
                &paths.style_variables,
                self.then_reload(TaskGraph::task(StyleTask)),
            )?,
            from_spec("sassStyles", &paths.sass, TaskGraph::task(SassTask))?,
            from_spec(
                "styles",
                &paths.styles,
                self.then_reload(TaskGraph::task(StyleTask)),
            )?,
            from_spec(
                "scripts",
                &paths.scripts,
                self.then_reload(TaskGraph::task(ScriptTask::new())),
            )?,
            from_spec(
                "jsMin",
                &paths.scripts_min,
                self.then_reload(TaskGraph::task(CopyTask::scripts_min())),
            )?,
            from_spec(
                "jsLibs",
                &paths.script_libs,
                self.then_reload(TaskGraph::task(CopyTask::script_libs())),
            )?,
            from_spec(
                "images",
                &paths.images,
                self.then_reload(TaskGraph::task(ImageTask)),
            )?,
        ])
    }
}
