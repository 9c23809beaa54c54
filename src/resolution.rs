//! Section resolution.
//!
//! # Responsibilities
//! - Answer `get_section(name, path)` with a shared, immutable value
//! - Pick the effective source: literal-path override, request-narrowed
//!   override, or the document's own sections (then its ancestors)
//! - Populate the section cache under the key matching that source
//!
//! # Design Decisions
//! - The cache key is chosen by which source produced the value, so a
//!   value read from a document's defaults is shared by every path that
//!   reaches that document without an override, and is never served for a
//!   path that has one (in the document or any of its ancestors)
//! - Absent sections are not cached
//! - Assembled documents are held per owner until the section cache is next
//!   cleared, so a lookup whose section is cached never touches the store
//! - Only load and factory failures surface as errors
//!
//! # Data Flow
//! ```text
//! (name, path, request?)
//!     → PathResolver (owner)
//!     → loaded documents (same generation?) ── else ──▶ DocumentStore
//!     → find_override(query) ── hit ──▶ Location key
//!     → find_override(request dir) ── hit ──▶ Path key
//!     → ancestor override covers query ──▶ Location key
//!     → otherwise ──▶ Document key
//!     → SectionCache hit? return
//!     → Effective::section → SectionRegistry::materialize → SectionCache::add
//! ```

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::{SectionCache, SectionKey};
use crate::document::{
    ancestor_override_applies, find_override, ConfigDocument, DocumentStore, Effective,
    LocationOverride, ResolvedSection, SectionError, SectionRegistry, StoreError,
};
use crate::paths::{ConfigPath, PathResolver, VirtualPath};

/// Errors surfaced by section resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] StoreError),

    #[error(transparent)]
    Section(#[from] SectionError),
}

/// The in-flight request a lookup is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Literal path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A document assembled during cache generation `generation`.
struct LoadedDocument {
    generation: u64,
    document: Arc<ConfigDocument>,
}

/// Façade over path resolution, override lookup and caching.
pub struct ConfigurationResolutionService {
    resolver: Arc<PathResolver>,
    store: Arc<dyn DocumentStore>,
    registry: Arc<SectionRegistry>,
    cache: Arc<SectionCache>,
    documents: DashMap<VirtualPath, LoadedDocument>,
}

impl ConfigurationResolutionService {
    pub fn new(
        resolver: Arc<PathResolver>,
        store: Arc<dyn DocumentStore>,
        registry: Arc<SectionRegistry>,
        cache: Arc<SectionCache>,
    ) -> Self {
        Self {
            resolver,
            store,
            registry,
            cache,
            documents: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<SectionCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    /// Resolve section `name` for `path`.
    ///
    /// Returns `Ok(None)` for an empty name or a section declared nowhere in
    /// the document chain.
    pub fn get_section(
        &self,
        name: &str,
        path: &str,
        request: Option<&RequestContext>,
    ) -> Result<Option<Arc<ResolvedSection>>, ResolveError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let generation = self.cache.generation();
        let raw = path.trim();
        let owner = self.resolver.resolve(raw);
        let document = self.document(&owner, generation)?;
        let outside = owner.outside_application;

        let query = if raw.is_empty() {
            owner.virtual_path.clone()
        } else {
            self.resolver.mapper().normalize(raw)
        };

        let literal = find_override(&document, &query, outside);
        let (key, location, scope) = match (literal, self.narrow(&document, request, outside)) {
            (Some(location), _) => (
                SectionKey::location(name, document.path(), &query),
                Some(location),
                query,
            ),
            (None, Some((request_dir, location))) => (
                SectionKey::path(name, document.path(), request_dir.as_str()),
                Some(location),
                request_dir,
            ),
            (None, None) if ancestor_override_applies(&document, &query, outside) => {
                (SectionKey::location(name, document.path(), &query), None, query)
            }
            (None, None) => (SectionKey::document(name, document.path()), None, query),
        };

        if let Some(cached) = self.cache.try_get(&key) {
            return Ok(Some(cached));
        }

        let Some(raw_value) = Effective::new(&document, location).section(name, &scope, outside) else {
            tracing::debug!(section = name, path = raw, "Section not declared");
            return Ok(None);
        };

        let value = self.registry.materialize(name, raw_value)?;
        let section = Arc::new(ResolvedSection::new(
            name,
            document.path().clone(),
            location.map(|location| location.path().to_string()),
            raw_value.clone(),
            value,
        ));
        tracing::debug!(section = name, document = %document.path(), ?key, "Section resolved");

        if !self.cache.add_if_current(key.clone(), section.clone(), generation) {
            if let Some(existing) = self.cache.try_get(&key) {
                return Ok(Some(existing));
            }
        }
        Ok(Some(section))
    }

    /// The document governing `owner`, loaded from the store at most once
    /// per cache generation.
    fn document(&self, owner: &ConfigPath, generation: u64) -> Result<Arc<ConfigDocument>, StoreError> {
        if let Some(loaded) = self.documents.get(&owner.virtual_path) {
            if loaded.generation == generation {
                return Ok(loaded.document.clone());
            }
        }

        let document = self.store.load_document(owner)?;
        self.documents.insert(
            owner.virtual_path.clone(),
            LoadedDocument {
                generation,
                document: document.clone(),
            },
        );
        Ok(document)
    }

    /// The override selected by the request's directory, when it differs
    /// from the document's own path.
    fn narrow<'a>(
        &self,
        document: &'a ConfigDocument,
        request: Option<&RequestContext>,
        outside: bool,
    ) -> Option<(VirtualPath, &'a LocationOverride)> {
        let request = request?;
        let request_dir = self.resolver.mapper().normalize(request.path()).directory();
        if &request_dir == document.path() {
            return None;
        }
        find_override(document, &request_dir, outside).map(|location| (request_dir, location))
    }

    /// Resolve `name` at the application root.
    pub fn get_application_section(&self, name: &str) -> Result<Option<Arc<ResolvedSection>>, ResolveError> {
        self.get_section(name, "", None)
    }

    /// Resolve `name` as `T`, falling back to `T::default()` when the section
    /// is absent, fails to load, or was materialized as another type.
    pub fn get_section_or_default<T>(&self, name: &str, path: &str) -> T
    where
        T: Any + Clone + Default,
    {
        match self.get_section(name, path, None) {
            Ok(Some(section)) => section.downcast_ref::<T>().cloned().unwrap_or_default(),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(section = name, path, error = %e, "Section lookup failed, using defaults");
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContent, MemoryStore};
    use crate::paths::{PathMapper, VirtualDirectory};
    use serde::Deserialize;
    use std::time::Duration;
    use toml::Value;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Timeout {
        seconds: i64,
    }

    fn table(text: &str) -> Value {
        Value::Table(text.parse::<toml::Table>().unwrap())
    }

    fn service(content: DocumentContent, registry: SectionRegistry) -> (ConfigurationResolutionService, Arc<MemoryStore>) {
        let mapper = Arc::new(PathMapper::new(VirtualDirectory::new("/app", "/srv/app")));
        let store = Arc::new(MemoryStore::new().with_document("/srv/app", content));
        let resolver = Arc::new(PathResolver::new(mapper, store.clone()));
        let cache = Arc::new(SectionCache::new(16, Duration::from_millis(200)));
        (
            ConfigurationResolutionService::new(resolver, store.clone(), Arc::new(registry), cache),
            store,
        )
    }

    fn admin_document() -> DocumentContent {
        DocumentContent::new()
            .with_section("timeout", table("seconds = 30"))
            .with_location(LocationOverride::new("/admin").with_section("timeout", table("seconds = 5")))
    }

    #[test]
    fn test_empty_name_is_none() {
        let (service, store) = service(admin_document(), SectionRegistry::new());
        assert!(service.get_section("", "/app", None).unwrap().is_none());
        assert!(service.get_section("  ", "/app", None).unwrap().is_none());
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_document_without_overrides() {
        let content = DocumentContent::new().with_section("timeout", table("seconds = 30"));
        let (service, _) = service(content, SectionRegistry::new());

        let section = service.get_section("timeout", "/app/pages/default", None).unwrap().unwrap();
        assert_eq!(section.raw(), &table("seconds = 30"));
        assert_eq!(section.document().as_str(), "/app");
        assert_eq!(section.location(), None);
    }

    #[test]
    fn test_override_applies_beneath_its_path_only() {
        let (service, _) = service(admin_document(), SectionRegistry::new());

        let admin = service.get_section("timeout", "/app/admin/users", None).unwrap().unwrap();
        assert_eq!(admin.raw(), &table("seconds = 5"));
        assert_eq!(admin.location(), Some("admin"));

        let public = service.get_section("timeout", "/app/public", None).unwrap().unwrap();
        assert_eq!(public.raw(), &table("seconds = 30"));
    }

    #[test]
    fn test_repeated_calls_share_one_value() {
        let (service, _) = service(admin_document(), SectionRegistry::new());

        let first = service.get_section("timeout", "/app/a", None).unwrap().unwrap();
        let second = service.get_section("timeout", "/app/a", None).unwrap().unwrap();
        let sibling = service.get_section("timeout", "/app/b/page", None).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &sibling));

        let admin = service.get_section("timeout", "/app/admin", None).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &admin));
        assert_eq!(service.cache().len(), 2);
    }

    #[test]
    fn test_cached_lookups_skip_the_store() {
        let (service, store) = service(admin_document(), SectionRegistry::new());

        for _ in 0..5 {
            service.get_section("timeout", "/app/page", None).unwrap().unwrap();
        }
        service.get_section("timeout", "/app/admin/users", None).unwrap().unwrap();
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn test_clear_reloads_documents() {
        let (service, store) = service(admin_document(), SectionRegistry::new());
        service.get_section("timeout", "/app/page", None).unwrap().unwrap();

        store.insert("/srv/app", DocumentContent::new().with_section("timeout", table("seconds = 60")));
        let stale = service.get_section("timeout", "/app/page", None).unwrap().unwrap();
        assert_eq!(stale.raw(), &table("seconds = 30"));

        service.cache().clear();
        let fresh = service.get_section("timeout", "/app/page", None).unwrap().unwrap();
        assert_eq!(fresh.raw(), &table("seconds = 60"));
        assert_eq!(store.load_count(), 2);
    }

    #[test]
    fn test_request_context_narrows_override() {
        let (service, _) = service(admin_document(), SectionRegistry::new());
        let request = RequestContext::new("/app/admin/users/list");

        let narrowed = service.get_section("timeout", "/app/page", Some(&request)).unwrap().unwrap();
        assert_eq!(narrowed.raw(), &table("seconds = 5"));

        let plain = service.get_section("timeout", "/app/page", None).unwrap().unwrap();
        assert_eq!(plain.raw(), &table("seconds = 30"));
    }

    #[test]
    fn test_missing_section_is_not_cached() {
        let (service, _) = service(admin_document(), SectionRegistry::new());
        assert!(service.get_section("pages", "/app", None).unwrap().is_none());
        assert!(service.cache().is_empty());
    }

    #[test]
    fn test_typed_sections() {
        let mut registry = SectionRegistry::new();
        registry.register_deserialize::<Timeout>("timeout");
        let (service, _) = service(admin_document(), registry);

        let section = service.get_application_section("timeout").unwrap().unwrap();
        assert_eq!(section.downcast_ref::<Timeout>(), Some(&Timeout { seconds: 30 }));

        let timeout: Timeout = service.get_section_or_default("timeout", "/app/admin");
        assert_eq!(timeout.seconds, 5);

        let missing: Timeout = service.get_section_or_default("absent", "/app");
        assert_eq!(missing, Timeout::default());
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = SectionRegistry::new();
        registry.register_deserialize::<Timeout>("timeout");
        let content = DocumentContent::new().with_section("timeout", table("seconds = 'soon'"));
        let (service, _) = service(content, registry);

        let err = service.get_section("timeout", "/app", None).unwrap_err();
        assert!(matches!(err, ResolveError::Section(_)));

        let fallback: Timeout = service.get_section_or_default("timeout", "/app");
        assert_eq!(fallback, Timeout::default());
    }
}
