//! Configuration documents.
//!
//! # Data Flow
//! ```text
//! <dir>/web.toml
//!     → store.rs (read, parse, link parent chain)
//!     → model.rs (ConfigDocument: sections + location overrides)
//!     → location.rs (most specific override for a query path)
//!     → registry.rs (raw section → typed value)
//! ```
//!
//! # Design Decisions
//! - Documents are immutable; a rewritten file yields a new document
//! - Section shapes are opaque here; the host registers factories

pub mod location;
pub mod model;
pub mod registry;
pub mod store;

pub use location::{ancestor_override_applies, applies, find_override, Effective};
pub use model::{ConfigDocument, DocumentContent, LocationOverride};
pub use registry::{ResolvedSection, SectionError, SectionRegistry, SectionValue};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
