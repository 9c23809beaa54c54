//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::EngineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `cache.capacity` at process start.
pub const CACHE_SIZE_ENV: &str = "CONFPATH_SECTION_CACHE_SIZE";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Relative physical paths are resolved against the file's directory, and
/// the cache-size environment override is applied before validation.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: EngineConfig = toml::from_str(&content)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_relative_paths(&mut config, base);
    let config = apply_env_and_validate(config)?;

    tracing::info!(
        path = ?path,
        application = %config.application.virtual_root,
        physical_root = ?config.application.physical_root,
        cache_capacity = config.cache.capacity,
        "Configuration loaded"
    );
    Ok(config)
}

/// Apply environment overrides to `config`, then validate it.
pub fn apply_env_and_validate(mut config: EngineConfig) -> Result<EngineConfig, ConfigError> {
    apply_cache_size_override(&mut config, std::env::var(CACHE_SIZE_ENV).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Anchor every relative physical path in `config` at `base`.
pub fn resolve_relative_paths(config: &mut EngineConfig, base: &Path) {
    let anchor = |path: &mut PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };

    anchor(&mut config.application.physical_root);
    if let Some(machine) = config.application.machine_config.as_mut() {
        anchor(machine);
    }
    for dir in &mut config.virtual_directories {
        anchor(&mut dir.physical_path);
    }
}

/// Apply the cache-size override, if `value` holds one.
///
/// An unparsable value is logged and ignored.
pub fn apply_cache_size_override(config: &mut EngineConfig, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match value.trim().parse::<usize>() {
        Ok(capacity) => {
            tracing::info!(
                from = config.cache.capacity,
                to = capacity,
                "Section cache capacity overridden by {}",
                CACHE_SIZE_ENV
            );
            config.cache.capacity = capacity;
        }
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Ignoring invalid {}", CACHE_SIZE_ENV);
        }
    }
}
