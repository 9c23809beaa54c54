//! Path-scoped configuration resolution and caching.
//!
//! Maps a hierarchy of per-directory configuration documents onto resolved,
//! shareable section values: find the document owning a path, pick the most
//! specific location override, cache the result, and invalidate it when the
//! engine rewrites a document.

pub mod cache;
pub mod config;
pub mod document;
pub mod lifecycle;
pub mod observability;
pub mod paths;
pub mod resolution;
pub mod save;

pub use cache::{SectionCache, SectionKey};
pub use config::EngineConfig;
pub use document::{
    ConfigDocument, DocumentContent, DocumentStore, FileStore, LocationOverride, MemoryStore, ResolvedSection,
    SectionRegistry,
};
pub use lifecycle::Engine;
pub use paths::{ConfigPath, PathResolver, VirtualPath};
pub use resolution::{ConfigurationResolutionService, RequestContext, ResolveError};
pub use save::{SaveCoordinator, SaveEvent};
