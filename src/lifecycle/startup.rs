//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Construct every engine object in dependency order
//! - Wire the save coordinator to the file store
//!
//! # Design Decisions
//! - Fail fast: any configuration error is fatal
//! - The host supplies the section registry, watcher control and timer
//!   source; the engine owns nothing global

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::SectionCache;
use crate::config::loader::{load_config, ConfigError};
use crate::config::EngineConfig;
use crate::document::{DocumentContent, FileStore, ResolvedSection, SectionRegistry, StoreError};
use crate::paths::{PathMapper, PathResolver};
use crate::resolution::{ConfigurationResolutionService, RequestContext, ResolveError};
use crate::save::{SaveCoordinator, Scheduler, WatchControl};

/// A fully assembled resolution engine.
pub struct Engine {
    config: EngineConfig,
    mapper: Arc<PathMapper>,
    store: Arc<FileStore>,
    cache: Arc<SectionCache>,
    coordinator: SaveCoordinator,
    service: ConfigurationResolutionService,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        registry: SectionRegistry,
        watch: Arc<dyn WatchControl>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let mapper = Arc::new(PathMapper::from_config(&config));
        let store = Arc::new(FileStore::from_config(&config, mapper.clone()));
        let resolver = Arc::new(PathResolver::new(mapper.clone(), store.clone()));
        let cache = Arc::new(SectionCache::from_config(&config.cache));

        let primary_document = store.document_file(mapper.application_physical_root());
        let coordinator = SaveCoordinator::with_settings(
            cache.clone(),
            primary_document,
            watch,
            scheduler,
            Duration::from_millis(config.watcher.debounce_ms),
            config.watcher.file_pattern.clone(),
        );
        store.subscribe(Arc::new(coordinator.clone()));

        let service = ConfigurationResolutionService::new(resolver, store.clone(), Arc::new(registry), cache.clone());

        tracing::info!(
            application = %mapper.application_root(),
            physical_root = ?mapper.application_physical_root(),
            cache_capacity = cache.capacity(),
            "Resolution engine ready"
        );

        Self {
            config,
            mapper,
            store,
            cache,
            coordinator,
            service,
        }
    }

    /// Load configuration from `path` and assemble the engine.
    pub fn load(
        path: &Path,
        registry: SectionRegistry,
        watch: Arc<dyn WatchControl>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, ConfigError> {
        let config = load_config(path)?;
        Ok(Self::new(config, registry, watch, scheduler))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mapper(&self) -> &Arc<PathMapper> {
        &self.mapper
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<SectionCache> {
        &self.cache
    }

    pub fn coordinator(&self) -> &SaveCoordinator {
        &self.coordinator
    }

    pub fn service(&self) -> &ConfigurationResolutionService {
        &self.service
    }

    /// Shorthand for [`ConfigurationResolutionService::get_section`].
    pub fn get_section(
        &self,
        name: &str,
        path: &str,
        request: Option<&RequestContext>,
    ) -> Result<Option<Arc<ResolvedSection>>, ResolveError> {
        self.service.get_section(name, path, request)
    }

    /// Write `content` as the document of virtual directory `directory`.
    pub fn save_document(&self, directory: &str, content: &DocumentContent) -> Result<(), StoreError> {
        let path = self.mapper.normalize(directory);
        let Some(location) = self.mapper.map(&path) else {
            return Err(StoreError::NotFound {
                path: PathBuf::from(directory),
            });
        };
        self.store.save(&location, content)
    }
}
