//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, anchor relative paths, env override)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → lifecycle::Engine (assembles the engine from it)
//!
//! While running:
//!     watcher.rs detects document changes
//!     → suppressed while the engine writes its own documents
//!     → otherwise forwarded as ReloadSignal
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{apply_env_and_validate, load_config, ConfigError, CACHE_SIZE_ENV};
pub use schema::{ApplicationConfig, CacheConfig, EngineConfig, ObservabilityConfig, VirtualDirectoryConfig, WatcherConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::{ConfigWatcher, ReloadSignal, WatchHandle};
