//! Shared fixtures for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use confpath::config::{EngineConfig, VirtualDirectoryConfig};
use confpath::save::{Scheduler, WatchControl};
use confpath::{Engine, SectionRegistry};

/// A temporary site:
///
/// ```text
/// <tmp>/machine.toml   machine-wide root document
/// <tmp>/app/           application "/app"
/// <tmp>/other/         sibling application "/other"
/// ```
pub struct Site {
    dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::create_dir_all(dir.path().join("other")).unwrap();
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn app_root(&self) -> PathBuf {
        self.path("app")
    }

    /// Write `text` as the document of `relative` (e.g. "app/sub").
    pub fn document(&self, relative: &str, text: &str) -> &Self {
        let dir = self.path(relative);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("web.toml"), text).unwrap();
        self
    }

    #[allow(dead_code)]
    pub fn machine(&self, text: &str) -> &Self {
        fs::write(self.path("machine.toml"), text).unwrap();
        self
    }

    #[allow(dead_code)]
    pub fn mkdir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.path(relative)).unwrap();
        self
    }

    pub fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.application.virtual_root = "/app".into();
        config.application.physical_root = self.app_root();
        config.application.machine_config = Some(self.path("machine.toml"));
        config.virtual_directories.push(VirtualDirectoryConfig {
            virtual_path: "/other".into(),
            physical_path: self.path("other"),
        });
        config
    }

    pub fn engine_with(
        &self,
        registry: SectionRegistry,
        watch: Arc<dyn WatchControl>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Engine {
        Engine::new(self.config(), registry, watch, scheduler)
    }
}

/// Records watcher control calls.
#[derive(Default)]
pub struct RecordingWatch {
    calls: Mutex<Vec<(&'static str, PathBuf)>>,
}

impl RecordingWatch {
    #[allow(dead_code)]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|(kind, _)| *kind).collect()
    }

    #[allow(dead_code)]
    pub fn directories(&self) -> Vec<PathBuf> {
        self.calls.lock().iter().map(|(_, dir)| dir.clone()).collect()
    }
}

impl WatchControl for RecordingWatch {
    fn disable_watch(&self, directory: &Path, _file_pattern: &str) {
        self.calls.lock().push(("disable", directory.to_path_buf()));
    }

    fn enable_watch(&self, directory: &Path, _file_pattern: &str) {
        self.calls.lock().push(("enable", directory.to_path_buf()));
    }
}

/// Parse a TOML table literal.
#[allow(dead_code)]
pub fn table(text: &str) -> toml::Value {
    toml::Value::Table(text.parse::<toml::Table>().unwrap())
}
