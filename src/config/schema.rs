//! Configuration schema definitions.
//!
//! This module defines the complete engine configuration structure.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the resolution engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// The application whose documents are resolved.
    pub application: ApplicationConfig,

    /// Additional virtual directory mappings (e.g. sibling applications).
    pub virtual_directories: Vec<VirtualDirectoryConfig>,

    /// Section cache sizing.
    pub cache: CacheConfig,

    /// Watcher suppression settings.
    pub watcher: WatcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Virtual root of the application (e.g. "/app").
    pub virtual_root: String,

    /// Physical directory the virtual root maps to.
    pub physical_root: PathBuf,

    /// Name of the per-directory document file.
    pub config_file_name: String,

    /// Optional machine-wide root document.
    pub machine_config: Option<PathBuf>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            virtual_root: "/".to_string(),
            physical_root: PathBuf::from("."),
            config_file_name: "web.toml".to_string(),
            machine_config: None,
        }
    }
}

/// One virtual to physical mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualDirectoryConfig {
    pub virtual_path: String,
    pub physical_path: PathBuf,
}

/// Section cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached sections.
    pub capacity: usize,

    /// Bounded wait for the cache write lock on insert (milliseconds).
    pub add_lock_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            add_lock_timeout_ms: 200,
        }
    }
}

/// Watcher suppression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet window before a suppressed watcher is re-enabled (milliseconds).
    pub debounce_ms: u64,

    /// Glob of watched document file names.
    pub file_pattern: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 6000,
            file_pattern: "?eb.toml".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
