//! Resolved section caching.
//!
//! # Data Flow
//! ```text
//! ConfigurationResolutionService
//!     → section.rs (reader/writer discipline, bounded-wait add)
//!     → lru.rs (fixed capacity, least recently used eviction)
//!
//! SaveCoordinator
//!     → section.rs clear()
//! ```

pub mod lru;
pub mod section;

pub use lru::LruCache;
pub use section::{SectionCache, SectionKey};
