//! Bounded, concurrent section cache.
//!
//! # Responsibilities
//! - Hold resolved sections under composite keys
//! - Let readers proceed concurrently; serialize inserts and clears
//! - Evict the least recently used entry when full
//!
//! # Design Decisions
//! - `add` waits a bounded time for the write lock and gives up silently;
//!   a skipped insert only costs a recomputation
//! - `add` never replaces an existing entry (first writer wins)
//! - `clear` blocks until it holds the lock, so no read issued after it
//!   returns can observe a dropped entry
//! - The first eviction logs a one-time sizing hint
//! - Every `clear` starts a new generation; callers that computed a value
//!   from state read before a clear can have it refused

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::cache::lru::LruCache;
use crate::config::schema::CacheConfig;
use crate::document::ResolvedSection;
use crate::observability::metrics;
use crate::paths::VirtualPath;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    /// Section read through an override of `document`, for the literal
    /// request `path`.
    Location {
        section: String,
        document: VirtualPath,
        path: VirtualPath,
    },
    /// Section read through an override of `document` selected by the
    /// request `path`.
    Path {
        section: String,
        document: VirtualPath,
        path: String,
    },
    /// Section read from the default sections of `document`.
    Document { section: String, document: VirtualPath },
}

impl SectionKey {
    pub fn location(section: &str, document: &VirtualPath, path: &VirtualPath) -> Self {
        Self::Location {
            section: section.to_string(),
            document: document.clone(),
            path: path.clone(),
        }
    }

    pub fn path(section: &str, document: &VirtualPath, path: &str) -> Self {
        Self::Path {
            section: section.to_string(),
            document: document.clone(),
            path: path.to_string(),
        }
    }

    pub fn document(section: &str, document: &VirtualPath) -> Self {
        Self::Document {
            section: section.to_string(),
            document: document.clone(),
        }
    }

    pub fn section(&self) -> &str {
        match self {
            Self::Location { section, .. } | Self::Path { section, .. } | Self::Document { section, .. } => section,
        }
    }
}

/// Cache of resolved sections shared by all callers.
pub struct SectionCache {
    entries: RwLock<LruCache<SectionKey, Arc<ResolvedSection>>>,
    add_timeout: Duration,
    full_warned: AtomicBool,
    generation: AtomicU64,
}

impl SectionCache {
    pub fn new(capacity: usize, add_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            add_timeout,
            full_warned: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_millis(config.add_lock_timeout_ms))
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub fn try_get(&self, key: &SectionKey) -> Option<Arc<ResolvedSection>> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(section) => {
                metrics::record_cache_hit();
                tracing::debug!(?key, "Section cache hit");
                Some(section.clone())
            }
            None => {
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Insert `section` under `key`.
    ///
    /// Returns `false` when the key was already present or the write lock
    /// could not be taken in time; the cache is unchanged in both cases.
    pub fn add(&self, key: SectionKey, section: Arc<ResolvedSection>) -> bool {
        self.insert(key, section, None)
    }

    /// Insert `section` under `key` unless the cache was cleared after
    /// `generation` was read.
    pub fn add_if_current(&self, key: SectionKey, section: Arc<ResolvedSection>, generation: u64) -> bool {
        self.insert(key, section, Some(generation))
    }

    /// Number of clears so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn insert(&self, key: SectionKey, section: Arc<ResolvedSection>, generation: Option<u64>) -> bool {
        let Some(mut entries) = self.entries.try_write_for(self.add_timeout) else {
            metrics::record_cache_skipped_insert();
            tracing::warn!(?key, timeout = ?self.add_timeout, "Section cache busy, insert skipped");
            return false;
        };
        if generation.is_some_and(|generation| generation != self.generation()) {
            tracing::debug!(?key, "Section computed before the last clear, insert skipped");
            return false;
        }
        if entries.contains_key(&key) {
            return false;
        }

        if let Some((evicted, _)) = entries.insert(key, section) {
            metrics::record_cache_eviction();
            tracing::debug!(key = ?evicted, "Evicted least recently used section");
            if !self.full_warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    capacity = entries.capacity(),
                    "Section cache is full; consider raising cache.capacity or CONFPATH_SECTION_CACHE_SIZE"
                );
            }
        }
        metrics::record_cache_entries(entries.len());
        true
    }

    /// Drop every entry. Blocks until exclusive access is obtained.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        metrics::record_cache_clear();
        metrics::record_cache_entries(0);
        tracing::debug!(removed, "Section cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.read().capacity()
    }
}
