//! Document file watcher for hot reload.
//!
//! Watches the application tree for document files and forwards changes as
//! reload signals. Implements [`WatchControl`] so the save coordinator can
//! silence it while the engine writes its own documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use glob::Pattern;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::schema::EngineConfig;
use crate::save::WatchControl;

/// A document change the host should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSignal {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
struct Suppressed {
    directory: PathBuf,
    pattern: Pattern,
}

/// Shared suppression state; the control side of a [`ConfigWatcher`].
#[derive(Clone, Default)]
pub struct WatchHandle {
    suppressed: Arc<ArcSwap<Vec<Suppressed>>>,
}

impl WatchHandle {
    /// True when changes to `path` are currently silenced.
    pub fn is_suppressed(&self, path: &Path) -> bool {
        let (Some(directory), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
            return false;
        };
        self.suppressed
            .load()
            .iter()
            .any(|entry| entry.directory == directory && entry.pattern.matches(name))
    }

    fn compile(file_pattern: &str) -> Pattern {
        Pattern::new(file_pattern).unwrap_or_else(|e| {
            tracing::warn!(pattern = file_pattern, error = %e, "Invalid watch pattern, matching literally");
            Pattern::new(&Pattern::escape(file_pattern)).unwrap_or_default()
        })
    }
}

impl WatchControl for WatchHandle {
    fn disable_watch(&self, directory: &Path, file_pattern: &str) {
        let entry = Suppressed {
            directory: directory.to_path_buf(),
            pattern: Self::compile(file_pattern),
        };
        self.suppressed.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(entry.clone());
            next
        });
        tracing::debug!(directory = ?directory, pattern = file_pattern, "Watch disabled");
    }

    fn enable_watch(&self, directory: &Path, file_pattern: &str) {
        let entry = Suppressed {
            directory: directory.to_path_buf(),
            pattern: Self::compile(file_pattern),
        };
        self.suppressed.rcu(|current| {
            let mut next = Vec::clone(current);
            if let Some(index) = next.iter().position(|existing| existing == &entry) {
                next.remove(index);
            }
            next
        });
        tracing::debug!(directory = ?directory, pattern = file_pattern, "Watch enabled");
    }
}

/// Decides which filesystem paths become reload signals.
#[derive(Clone)]
struct EventFilter {
    pattern: Pattern,
    handle: WatchHandle,
}

impl EventFilter {
    fn accept(&self, path: &Path) -> bool {
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.pattern.matches(name));
        if !matches {
            return false;
        }
        if self.handle.is_suppressed(path) {
            tracing::debug!(path = ?path, "Change ignored while watch is suppressed");
            return false;
        }
        true
    }
}

/// A watcher that monitors document files for changes.
pub struct ConfigWatcher {
    root: PathBuf,
    filter: EventFilter,
    update_tx: mpsc::UnboundedSender<ReloadSignal>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher over `root`.
    ///
    /// Returns the watcher and a receiver for reload signals.
    pub fn new(
        root: &Path,
        file_pattern: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReloadSignal>), glob::PatternError> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let filter = EventFilter {
            pattern: Pattern::new(file_pattern)?,
            handle: WatchHandle::default(),
        };

        Ok((
            Self {
                root: root.to_path_buf(),
                filter,
                update_tx,
            },
            update_rx,
        ))
    }

    pub fn from_config(
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReloadSignal>), glob::PatternError> {
        Self::new(&config.application.physical_root, &config.watcher.file_pattern)
    }

    /// Control handle for suppressing this watcher.
    pub fn handle(&self) -> WatchHandle {
        self.filter.handle.clone()
    }

    /// Start watching the tree in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let filter = self.filter.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    for path in event.paths {
                        if filter.accept(&path) {
                            tracing::info!(path = ?path, "Document change detected");
                            let _ = tx.send(ReloadSignal { path });
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tracing::info!(root = ?self.root, "Document watcher started");
        Ok(watcher)
    }
}
