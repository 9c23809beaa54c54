//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Assemble engine (mapper, store, cache,
//!     resolver, coordinator) → Subscribe coordinator to saves
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → watch loop exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then leaves, then the façade
//! - Every engine object is constructed explicitly; nothing is global

pub mod signals;
pub mod startup;

pub use startup::Engine;
