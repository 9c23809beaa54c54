//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity, timeouts, debounce window > 0)
//! - Check path shapes (rooted virtual paths, absolute physical paths)
//! - Detect duplicate virtual directories
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::EngineConfig;
use crate::paths::VirtualPath;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let app = &config.application;
    if !app.virtual_root.starts_with('/') {
        errors.push(ValidationError::new("application.virtual_root", "must start with '/'"));
    }
    if !app.physical_root.is_absolute() {
        errors.push(ValidationError::new("application.physical_root", "must be an absolute path"));
    }
    if app.config_file_name.trim().is_empty() || app.config_file_name.contains(&['/', '\\'][..]) {
        errors.push(ValidationError::new(
            "application.config_file_name",
            "must be a plain, non-empty file name",
        ));
    }
    if let Some(machine) = &app.machine_config {
        if !machine.is_absolute() {
            errors.push(ValidationError::new("application.machine_config", "must be an absolute path"));
        }
    }

    let mut seen = HashSet::new();
    seen.insert(VirtualPath::new(&app.virtual_root).trim_trailing_slash());
    for (i, dir) in config.virtual_directories.iter().enumerate() {
        let field = format!("virtual_directories[{i}]");
        if !dir.virtual_path.starts_with('/') {
            errors.push(ValidationError::new(format!("{field}.virtual_path"), "must start with '/'"));
        }
        if !dir.physical_path.is_absolute() {
            errors.push(ValidationError::new(format!("{field}.physical_path"), "must be an absolute path"));
        }
        if !seen.insert(VirtualPath::new(&dir.virtual_path).trim_trailing_slash()) {
            errors.push(ValidationError::new(
                format!("{field}.virtual_path"),
                format!("'{}' is mapped more than once", dir.virtual_path),
            ));
        }
    }

    if config.cache.capacity == 0 {
        errors.push(ValidationError::new("cache.capacity", "must be greater than 0"));
    }
    if config.cache.add_lock_timeout_ms == 0 {
        errors.push(ValidationError::new("cache.add_lock_timeout_ms", "must be greater than 0"));
    }

    if config.watcher.debounce_ms == 0 {
        errors.push(ValidationError::new("watcher.debounce_ms", "must be greater than 0"));
    }
    if let Err(e) = glob::Pattern::new(&config.watcher.file_pattern) {
        errors.push(ValidationError::new("watcher.file_pattern", e.to_string()));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
