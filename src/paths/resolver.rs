//! Owning-document resolution.
//!
//! # Responsibilities
//! - Normalize caller input and map it to physical storage
//! - Walk upward to the nearest directory that owns a document
//! - Flag owners that live outside the application's physical tree
//! - Remember the answer per distinct input string
//!
//! # Design Decisions
//! - The mapping cache has no eviction: document ownership does not move
//!   while the process runs
//! - Unmappable input is not an error; the literal input becomes its own
//!   owner and loading fails downstream if nothing is there
//!
//! # Data Flow
//! ```text
//! raw input ──▶ cache (raw key) ──hit──▶ ConfigPath
//!     │ miss
//!     ▼
//! normalize ──▶ map ──none──▶ literal fallback (uncached)
//!     │
//!     ▼
//! start dir ──▶ cache (start key) ──hit──▶ ConfigPath
//!     │ miss
//!     ▼
//! walk up until a document exists or the stop root is reached
//!     │
//!     ▼
//! cache under raw + start keys ──▶ ConfigPath
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::document::DocumentStore;
use crate::observability::metrics;
use crate::paths::{PathMapper, VirtualPath};

/// The resolved owner of a path: the document that governs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    /// Virtual path of the owning document's directory.
    pub virtual_path: VirtualPath,
    /// Physical directory of the owning document.
    pub location: PathBuf,
    /// True when `location` lies outside the application's physical tree.
    pub outside_application: bool,
}

/// Maps request paths to the documents that own them.
pub struct PathResolver {
    mapper: Arc<PathMapper>,
    store: Arc<dyn DocumentStore>,
    owners: DashMap<String, ConfigPath>,
}

impl PathResolver {
    pub fn new(mapper: Arc<PathMapper>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            mapper,
            store,
            owners: DashMap::new(),
        }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Owner of the application root.
    pub fn application_owner(&self) -> ConfigPath {
        ConfigPath {
            virtual_path: self.mapper.application_root().clone(),
            location: self.mapper.application_physical_root().to_path_buf(),
            outside_application: false,
        }
    }

    /// Number of memoized input strings.
    pub fn cached_paths(&self) -> usize {
        self.owners.len()
    }

    /// Resolve the document owning `raw`.
    pub fn resolve(&self, raw: &str) -> ConfigPath {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.application_owner();
        }

        if let Some(owner) = self.owners.get(raw) {
            metrics::record_path_resolution("cached");
            return owner.clone();
        }

        let mut path = self.mapper.normalize(raw);
        let Some(location) = self.mapper.map(&path) else {
            tracing::debug!(path = raw, "Path is not beneath any virtual directory");
            metrics::record_path_resolution("unmapped");
            let location = PathBuf::from(raw);
            return ConfigPath {
                virtual_path: path,
                outside_application: !self.mapper.is_inside_application(&location),
                location,
            };
        };
        if !path.is_directory() && self.store.is_directory(&location) {
            path = path.as_directory();
        }

        let Some(mapping) = self.mapper.mapping_for(&path) else {
            return self.application_owner();
        };
        let mapping_root = mapping.virtual_path.clone();

        let mut start = path.directory();
        if !start.starts_with(&mapping_root) {
            start = mapping_root.clone();
        }
        let start_key = start.as_str().to_string();

        if let Some(owner) = self.owners.get(&start_key).map(|entry| entry.clone()) {
            self.owners.insert(raw.to_string(), owner.clone());
            metrics::record_path_resolution("cached");
            return owner;
        }

        let application_root = self.mapper.application_root();
        let stop = if start.starts_with(application_root) {
            application_root.clone()
        } else {
            mapping_root
        };

        let owner = self.walk(start, &stop);
        tracing::debug!(
            path = raw,
            owner = %owner.virtual_path,
            outside_application = owner.outside_application,
            "Resolved owning document"
        );
        metrics::record_path_resolution("walked");

        self.owners.insert(start_key, owner.clone());
        self.owners.insert(raw.to_string(), owner.clone());
        owner
    }

    fn walk(&self, start: VirtualPath, stop: &VirtualPath) -> ConfigPath {
        let mut current = start;
        loop {
            if let Some(location) = self.mapper.map(&current) {
                if &current == stop || self.store.document_exists(&location) {
                    return self.owner(current, location);
                }
            }
            match current.parent() {
                Some(parent) if parent.starts_with(stop) => current = parent,
                _ => break,
            }
        }

        match self.mapper.map(stop) {
            Some(location) => self.owner(stop.clone(), location),
            None => self.application_owner(),
        }
    }

    fn owner(&self, virtual_path: VirtualPath, location: PathBuf) -> ConfigPath {
        ConfigPath {
            virtual_path,
            outside_application: !self.mapper.is_inside_application(&location),
            location,
        }
    }
}
