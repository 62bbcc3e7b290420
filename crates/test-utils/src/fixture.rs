#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use rigbuild::config::{ConfigProvider, FileConfigProvider};
use rigbuild::paths::PathSet;
use rigbuild::tasks::TaskContext;

use crate::builders::ThemeConfigBuilder;

/// A throwaway theme project in a temp directory.
pub struct ThemeFixture {
    dir: TempDir,
    pub paths: Arc<PathSet>,
}

impl ThemeFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let paths = Arc::new(PathSet::from_root(dir.path()));
        Self { dir, paths }
    }

    /// Fixture with `dev/config/theme.toml` written from `builder`.
    pub fn with_config(builder: &ThemeConfigBuilder) -> Self {
        let fixture = Self::new();
        fixture.write_config(builder);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn write_config(&self, builder: &ThemeConfigBuilder) {
        fs::create_dir_all(self.paths.theme_config.parent().expect("config dir"))
            .expect("create config dir");
        fs::write(&self.paths.theme_config, builder.to_toml()).expect("write theme.toml");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn read_bytes(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Push a file's mtime into the past so that anything written later is
    /// strictly newer.
    pub fn age(&self, rel: &str, by: Duration) {
        let path = self.path(rel);
        let when = SystemTime::now() - by;
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .expect("open for touch");
        file.set_modified(when).expect("set mtime");
    }

    /// Context reading config from the fixture's files on disk.
    pub fn file_context(&self) -> TaskContext {
        let provider = FileConfigProvider::new(
            &self.paths.theme_config,
            &self.paths.style_variables,
        );
        TaskContext::new(Arc::new(provider), Arc::clone(&self.paths))
    }

    /// Context reading config from an arbitrary provider.
    pub fn context(&self, provider: Arc<dyn ConfigProvider>) -> TaskContext {
        TaskContext::new(provider, Arc::clone(&self.paths))
    }
}

impl Default for ThemeFixture {
    fn default() -> Self {
        Self::new()
    }
}
