//! Virtual path handling.
//!
//! # Data Flow
//! ```text
//! caller input ("~/admin/", "/app/page", "sub/page")
//!     → virtual_path.rs (canonical form)
//!     → mapper.rs (virtual directory table → physical location)
//!     → resolver.rs (walk up to the owning document, memoized)
//!     → ConfigPath
//! ```

pub mod mapper;
pub mod resolver;
pub mod virtual_path;

pub use mapper::{PathMapper, VirtualDirectory};
pub use resolver::{ConfigPath, PathResolver};
pub use virtual_path::VirtualPath;
