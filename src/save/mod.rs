//! Save-triggered invalidation and watcher suppression.
//!
//! # Data Flow
//! ```text
//! FileStore::save
//!     → events.rs (SaveEvent start/end)
//!     → coordinator.rs (clear cache, suppress watcher, debounce)
//!     → scheduler.rs (deferred rechecks)
//!     → WatchControl (config::watcher in production)
//! ```

pub mod coordinator;
pub mod events;
pub mod scheduler;

pub use coordinator::{SaveCallback, SaveCoordinator, DEFAULT_DEBOUNCE, DEFAULT_FILE_PATTERN};
pub use events::{NoopWatch, SaveEvent, SaveListener, WatchControl};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
