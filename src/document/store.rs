//! Document stores.
//!
//! # Responsibilities
//! - Answer "does this directory own a document?"
//! - Load the document governing a resolved owner, linked to its parents
//! - Write documents, raising save notifications around the write
//!
//! # Design Decisions
//! - Parsed file content is cached per file and keyed by modification stamp;
//!   a changed stamp means a fresh parse, never an in-place patch
//! - The parent chain is re-linked on every load so a parent rewrite is
//!   visible to children without invalidating them
//! - The machine-wide document, when configured, is the root of every chain

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::document::model::{ConfigDocument, DocumentContent};
use crate::paths::{ConfigPath, PathMapper, VirtualPath};
use crate::save::{SaveEvent, SaveListener};

/// Errors raised while loading or writing documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The owner location does not exist.
    #[error("no configuration location at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Valid TOML with an invalid document shape.
    #[error("malformed document {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to render document: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Access to configuration documents.
pub trait DocumentStore: Send + Sync {
    /// True when `directory` holds a document of its own.
    fn document_exists(&self, directory: &Path) -> bool;

    /// True when `location` is a directory.
    fn is_directory(&self, location: &Path) -> bool;

    /// Load the document governing `owner`.
    fn load_document(&self, owner: &ConfigPath) -> Result<Arc<ConfigDocument>, StoreError>;
}

#[derive(Clone)]
struct CachedContent {
    stamp: Option<(SystemTime, u64)>,
    content: Arc<DocumentContent>,
}

/// TOML documents on disk, one file per directory.
pub struct FileStore {
    mapper: Arc<PathMapper>,
    file_name: String,
    machine_config: Option<PathBuf>,
    contents: DashMap<PathBuf, CachedContent>,
    listeners: RwLock<Vec<Arc<dyn SaveListener>>>,
}

impl FileStore {
    pub fn new(mapper: Arc<PathMapper>, file_name: impl Into<String>) -> Self {
        Self {
            mapper,
            file_name: file_name.into(),
            machine_config: None,
            contents: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Use `file` as the machine-wide root document.
    pub fn with_machine_config(mut self, file: impl Into<PathBuf>) -> Self {
        self.machine_config = Some(file.into());
        self
    }

    pub fn from_config(config: &EngineConfig, mapper: Arc<PathMapper>) -> Self {
        let store = Self::new(mapper, config.application.config_file_name.clone());
        match &config.application.machine_config {
            Some(file) => store.with_machine_config(file.clone()),
            None => store,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path of the document file owned by `directory`.
    pub fn document_file(&self, directory: &Path) -> PathBuf {
        directory.join(&self.file_name)
    }

    /// Register a listener for save notifications.
    pub fn subscribe(&self, listener: Arc<dyn SaveListener>) {
        self.listeners.write().push(listener);
    }

    /// Write `content` as the document of `directory`.
    ///
    /// Listeners observe a start event before the write and an end event
    /// after it, whether or not the write succeeded.
    pub fn save(&self, directory: &Path, content: &DocumentContent) -> Result<(), StoreError> {
        let file = self.document_file(directory);
        let text = content.to_toml_string()?;

        self.notify(&SaveEvent::start(&file));
        let result = fs::write(&file, text).map_err(|source| StoreError::Io {
            path: file.clone(),
            source,
        });
        self.contents.remove(&file);
        self.notify(&SaveEvent::end(&file));

        match &result {
            Ok(()) => tracing::info!(path = ?file, "Configuration document saved"),
            Err(e) => tracing::error!(path = ?file, error = %e, "Configuration document save failed"),
        }
        result
    }

    fn notify(&self, event: &SaveEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_save(event);
        }
    }

    /// Parsed content of `file`, or `None` if the file does not exist.
    fn read_content(&self, file: &Path) -> Result<Option<Arc<DocumentContent>>, StoreError> {
        let metadata = match fs::metadata(file) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.contents.remove(file);
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: file.to_path_buf(),
                    source,
                })
            }
        };

        let stamp = metadata.modified().ok().map(|modified| (modified, metadata.len()));
        if let Some(cached) = self.contents.get(file) {
            if stamp.is_some() && cached.stamp == stamp {
                return Ok(Some(cached.content.clone()));
            }
        }

        let text = fs::read_to_string(file).map_err(|source| StoreError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let content = Arc::new(DocumentContent::parse(file, &text)?);
        tracing::debug!(path = ?file, "Parsed configuration document");

        self.contents.insert(
            file.to_path_buf(),
            CachedContent {
                stamp,
                content: content.clone(),
            },
        );
        Ok(Some(content))
    }

    fn machine_document(&self) -> Result<Option<Arc<ConfigDocument>>, StoreError> {
        let Some(file) = &self.machine_config else {
            return Ok(None);
        };
        let Some(content) = self.read_content(file)? else {
            tracing::warn!(path = ?file, "Machine configuration document not found");
            return Ok(None);
        };
        let location = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Some(Arc::new(ConfigDocument::new(VirtualPath::root(), location, content))))
    }

    fn assemble(&self, path: &VirtualPath, directory: &Path) -> Result<Arc<ConfigDocument>, StoreError> {
        let content = self
            .read_content(&self.document_file(directory))?
            .unwrap_or_default();
        let document = ConfigDocument::new(path.clone(), directory, content);
        let document = match self.parent_of(path)? {
            Some(parent) => document.with_parent(parent),
            None => document,
        };
        Ok(Arc::new(document))
    }

    /// The nearest ancestor document of `path`: the closest directory with a
    /// document of its own, the mapping root, and finally the machine root.
    fn parent_of(&self, path: &VirtualPath) -> Result<Option<Arc<ConfigDocument>>, StoreError> {
        let Some(mapping) = self.mapper.mapping_for(path) else {
            return self.machine_document();
        };
        let root = mapping.virtual_path.clone();

        let mut current = path.trim_trailing_slash();
        while current != root {
            let Some(parent) = current.parent() else {
                break;
            };
            current = parent;
            let Some(directory) = self.mapper.map(&current) else {
                break;
            };
            if current == root || self.document_exists(&directory) {
                return self.assemble(&current, &directory).map(Some);
            }
        }

        self.machine_document()
    }
}

impl DocumentStore for FileStore {
    fn document_exists(&self, directory: &Path) -> bool {
        self.document_file(directory).is_file()
    }

    fn is_directory(&self, location: &Path) -> bool {
        location.is_dir()
    }

    fn load_document(&self, owner: &ConfigPath) -> Result<Arc<ConfigDocument>, StoreError> {
        if !owner.location.is_dir() {
            return Err(StoreError::NotFound {
                path: owner.location.clone(),
            });
        }
        self.assemble(&owner.virtual_path, &owner.location)
    }
}

/// Documents held in memory, keyed by directory.
///
/// Documents are flat: no parent chain is linked. Useful for embedding and
/// for tests.
#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<PathBuf, Arc<DocumentContent>>,
    loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, directory: impl Into<PathBuf>, content: DocumentContent) -> Self {
        self.insert(directory, content);
        self
    }

    /// Place (or replace) the document of `directory`.
    pub fn insert(&self, directory: impl Into<PathBuf>, content: DocumentContent) {
        self.documents.insert(directory.into(), Arc::new(content));
    }

    pub fn remove(&self, directory: &Path) {
        self.documents.remove(directory);
    }

    /// Number of documents handed out so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl DocumentStore for MemoryStore {
    fn document_exists(&self, directory: &Path) -> bool {
        self.documents.contains_key(directory)
    }

    fn is_directory(&self, location: &Path) -> bool {
        self.documents.contains_key(location)
    }

    fn load_document(&self, owner: &ConfigPath) -> Result<Arc<ConfigDocument>, StoreError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let content = self
            .documents
            .get(&owner.location)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        Ok(Arc::new(ConfigDocument::new(
            owner.virtual_path.clone(),
            owner.location.clone(),
            content,
        )))
    }
}
