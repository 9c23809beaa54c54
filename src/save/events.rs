//! Save notifications and watcher control.

use std::path::{Path, PathBuf};

/// Raised when a document starts or finishes being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent {
    /// Document file being written.
    pub document_path: PathBuf,
    /// `true` before the write, `false` after it.
    pub is_start: bool,
}

impl SaveEvent {
    pub fn start(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            is_start: true,
        }
    }

    pub fn end(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            is_start: false,
        }
    }
}

/// Receiver of save notifications.
pub trait SaveListener: Send + Sync {
    fn on_save(&self, event: &SaveEvent);
}

/// Control over the externally owned file-change watcher.
pub trait WatchControl: Send + Sync {
    /// Stop reporting changes to files matching `file_pattern` in `directory`.
    fn disable_watch(&self, directory: &Path, file_pattern: &str);

    /// Resume reporting changes previously disabled with the same arguments.
    fn enable_watch(&self, directory: &Path, file_pattern: &str);
}

/// Watcher control that does nothing, for hosts without a watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatch;

impl WatchControl for NoopWatch {
    fn disable_watch(&self, _directory: &Path, _file_pattern: &str) {}

    fn enable_watch(&self, _directory: &Path, _file_pattern: &str) {}
}
