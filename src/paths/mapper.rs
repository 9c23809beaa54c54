//! Virtual to physical path mapping.
//!
//! # Responsibilities
//! - Hold the virtual directory table (application first)
//! - Normalize raw caller input (`~`, relative, rooted) to a [`VirtualPath`]
//! - Map virtual paths to physical directories
//! - Decide whether a physical location lies inside the application
//!
//! # Design Decisions
//! - Longest virtual directory wins when tables overlap
//! - Immutable after construction; shared via `Arc`

use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::paths::VirtualPath;

/// A single virtual directory mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDirectory {
    /// Virtual root of the mapping, without trailing slash.
    pub virtual_path: VirtualPath,
    /// Physical directory the virtual root maps to.
    pub physical_path: PathBuf,
}

impl VirtualDirectory {
    pub fn new(virtual_path: impl Into<VirtualPath>, physical_path: impl Into<PathBuf>) -> Self {
        Self {
            virtual_path: virtual_path.into().trim_trailing_slash(),
            physical_path: physical_path.into(),
        }
    }
}

/// Maps virtual paths onto physical storage.
#[derive(Debug, Clone)]
pub struct PathMapper {
    application: VirtualDirectory,
    directories: Vec<VirtualDirectory>,
}

impl PathMapper {
    /// Create a mapper for an application with no additional directories.
    pub fn new(application: VirtualDirectory) -> Self {
        Self {
            application,
            directories: Vec::new(),
        }
    }

    /// Add another virtual directory (e.g. a sibling application).
    pub fn with_directory(mut self, directory: VirtualDirectory) -> Self {
        self.directories.push(directory);
        self
    }

    /// Build the mapping table from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let application = VirtualDirectory::new(
            config.application.virtual_root.as_str(),
            config.application.physical_root.clone(),
        );
        config
            .virtual_directories
            .iter()
            .fold(Self::new(application), |mapper, dir| {
                mapper.with_directory(VirtualDirectory::new(
                    dir.virtual_path.as_str(),
                    dir.physical_path.clone(),
                ))
            })
    }

    /// Virtual root of the current application.
    pub fn application_root(&self) -> &VirtualPath {
        &self.application.virtual_path
    }

    /// Physical root of the current application.
    pub fn application_physical_root(&self) -> &Path {
        &self.application.physical_path
    }

    /// Normalize caller input into a canonical virtual path.
    ///
    /// `~` and `~/...` are relative to the application root, as is any input
    /// without a leading slash. Trailing slashes survive normalization.
    pub fn normalize(&self, raw: &str) -> VirtualPath {
        let raw = raw.trim();
        let root = self.application_root().as_directory();

        if raw.is_empty() || raw == "~" {
            return self.application_root().clone();
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            return root.join(rest);
        }
        if raw.starts_with('/') || raw.starts_with('\\') {
            return VirtualPath::new(raw);
        }
        root.join(raw)
    }

    /// The mapping whose virtual root most specifically contains `path`.
    pub fn mapping_for(&self, path: &VirtualPath) -> Option<&VirtualDirectory> {
        std::iter::once(&self.application)
            .chain(self.directories.iter())
            .filter(|dir| path.starts_with(&dir.virtual_path))
            .max_by_key(|dir| dir.virtual_path.depth())
    }

    /// Map a virtual path onto its physical location.
    ///
    /// Returns `None` when no virtual directory covers the path.
    pub fn map(&self, path: &VirtualPath) -> Option<PathBuf> {
        let mapping = self.mapping_for(path)?;
        let relative = path.relative_segments(&mapping.virtual_path)?;
        Some(
            relative
                .into_iter()
                .fold(mapping.physical_path.clone(), |acc, segment| acc.join(segment)),
        )
    }

    /// True when `physical` lies inside the application's physical tree.
    pub fn is_inside_application(&self, physical: &Path) -> bool {
        physical.starts_with(self.application_physical_root())
    }
}
