#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rigbuild::config::{ConfigProvider, StyleVariables, ThemeConfig};
use rigbuild::errors::{Result, RigError};

/// In-memory config provider whose values can be swapped between loads.
///
/// Every `load()` returns the value current at call time, mirroring the
/// file provider's "re-read on every call" behaviour.
#[derive(Debug)]
pub struct MemoryConfigProvider {
    config: Mutex<Option<ThemeConfig>>,
    variables: Mutex<StyleVariables>,
    loads: AtomicUsize,
}

impl MemoryConfigProvider {
    pub fn new(config: ThemeConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            variables: Mutex::new(StyleVariables::default()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Provider whose `load()` always fails, like a malformed config file.
    pub fn broken() -> Self {
        Self {
            config: Mutex::new(None),
            variables: Mutex::new(StyleVariables::default()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, config: ThemeConfig) {
        *self.config.lock().unwrap() = Some(config);
    }

    pub fn update(&self, f: impl FnOnce(&mut ThemeConfig)) {
        if let Some(config) = self.config.lock().unwrap().as_mut() {
            f(config);
        }
    }

    pub fn set_variable(&self, name: &str, value: &str) {
        self.variables
            .lock()
            .unwrap()
            .variables
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_query(&self, name: &str, value: &str) {
        self.variables
            .lock()
            .unwrap()
            .queries
            .insert(name.to_string(), value.to_string());
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn load(&self) -> Result<ThemeConfig> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.config
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RigError::ConfigError("no theme config".to_string()))
    }

    fn load_style_variables(&self) -> Result<StyleVariables> {
        Ok(self.variables.lock().unwrap().clone())
    }
}
