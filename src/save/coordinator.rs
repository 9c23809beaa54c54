//! Save coordination.
//!
//! # Responsibilities
//! - Clear the section cache on every save start and save end
//! - Suppress the file watcher while the primary application document is
//!   being written, and for a quiet window afterwards
//! - Fan save events out to registered callbacks
//!
//! # Design Decisions
//! - Invalidation is whole-cache; saves are rare, operator-driven events
//! - Debounce is fixed-interval: the recheck fires one window after the
//!   first save and keeps rescheduling itself by one window until the path
//!   has been quiet for a full window
//! - Saves of any other document skip suppression entirely
//! - Timers hold a weak reference; dropping the coordinator cancels them
//!
//! # Data Flow
//! ```text
//! SaveEvent ──▶ cache.clear()
//!     │
//!     ├─ primary document?
//!     │     start: suppress reload, disable watch, schedule recheck
//!     │     end:   lift reload suppression, stamp activity
//!     │
//!     └─ callbacks (registration order)
//!
//! recheck ── quiet ≥ window ──▶ enable watch
//!         └─ otherwise ───────▶ reschedule(window)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::cache::SectionCache;
use crate::observability::metrics;
use crate::save::events::{SaveEvent, SaveListener, WatchControl};
use crate::save::scheduler::Scheduler;

/// Default quiet window before the watcher is re-enabled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(6000);

/// Default pattern of watched document names.
pub const DEFAULT_FILE_PATTERN: &str = "?eb.toml";

/// Callback invoked for every save event.
pub type SaveCallback = Arc<dyn Fn(&SaveEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Suppression {
    last_activity: Instant,
    in_progress: bool,
}

struct Inner {
    cache: Arc<SectionCache>,
    primary_document: PathBuf,
    watch_directory: PathBuf,
    file_pattern: String,
    window: Duration,
    watch: Arc<dyn WatchControl>,
    scheduler: Arc<dyn Scheduler>,
    reload_suppressed: AtomicBool,
    suppressions: Mutex<HashMap<PathBuf, Suppression>>,
    callbacks: RwLock<Vec<SaveCallback>>,
}

/// Reacts to document saves.
#[derive(Clone)]
pub struct SaveCoordinator {
    inner: Arc<Inner>,
}

impl SaveCoordinator {
    /// Create a coordinator guarding `primary_document` (the application's
    /// root document file).
    pub fn new(
        cache: Arc<SectionCache>,
        primary_document: impl Into<PathBuf>,
        watch: Arc<dyn WatchControl>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::with_settings(
            cache,
            primary_document,
            watch,
            scheduler,
            DEFAULT_DEBOUNCE,
            DEFAULT_FILE_PATTERN,
        )
    }

    pub fn with_settings(
        cache: Arc<SectionCache>,
        primary_document: impl Into<PathBuf>,
        watch: Arc<dyn WatchControl>,
        scheduler: Arc<dyn Scheduler>,
        window: Duration,
        file_pattern: impl Into<String>,
    ) -> Self {
        let primary_document = primary_document.into();
        let watch_directory = primary_document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            inner: Arc::new(Inner {
                cache,
                primary_document,
                watch_directory,
                file_pattern: file_pattern.into(),
                window,
                watch,
                scheduler,
                reload_suppressed: AtomicBool::new(false),
                suppressions: Mutex::new(HashMap::new()),
                callbacks: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a callback run after invalidation, in registration order.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&SaveEvent) + Send + Sync + 'static,
    {
        self.inner.callbacks.write().push(Arc::new(callback));
    }

    /// True while the primary document is being written.
    pub fn is_reload_suppressed(&self) -> bool {
        self.inner.reload_suppressed.load(Ordering::SeqCst)
    }

    /// True while the watcher is disabled for the primary document.
    pub fn is_watch_suppressed(&self) -> bool {
        self.inner
            .suppressions
            .lock()
            .contains_key(&self.inner.primary_document)
    }

    pub fn primary_document(&self) -> &Path {
        &self.inner.primary_document
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Handle one save event.
    pub fn handle(&self, event: &SaveEvent) {
        self.inner.cache.clear();

        if event.document_path == self.inner.primary_document {
            Inner::track(&self.inner, event);
        } else {
            tracing::debug!(path = ?event.document_path, "Save of secondary document, watcher left alone");
        }

        // Callbacks may subscribe further callbacks.
        let callbacks = self.inner.callbacks.read().clone();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl SaveListener for SaveCoordinator {
    fn on_save(&self, event: &SaveEvent) {
        self.handle(event);
    }
}

impl Inner {
    fn track(this: &Arc<Self>, event: &SaveEvent) {
        this.reload_suppressed.store(event.is_start, Ordering::SeqCst);
        let now = this.scheduler.now();
        let path = event.document_path.clone();

        let newly_suppressed = {
            let mut suppressions = this.suppressions.lock();
            match suppressions.get_mut(&path) {
                Some(entry) => {
                    entry.last_activity = now;
                    entry.in_progress = event.is_start;
                    false
                }
                None if event.is_start => {
                    suppressions.insert(
                        path.clone(),
                        Suppression {
                            last_activity: now,
                            in_progress: true,
                        },
                    );
                    true
                }
                None => false,
            }
        };

        if newly_suppressed {
            this.watch.disable_watch(&this.watch_directory, &this.file_pattern);
            metrics::record_watcher_suppressed(&this.watch_directory, true);
            tracing::info!(
                directory = ?this.watch_directory,
                pattern = %this.file_pattern,
                "Watcher disabled for configuration save"
            );
            Self::schedule_recheck(this, path);
        }
    }

    fn schedule_recheck(this: &Arc<Self>, path: PathBuf) {
        let weak: Weak<Self> = Arc::downgrade(this);
        this.scheduler.schedule(
            this.window,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::recheck(&inner, path);
                }
            }),
        );
    }

    fn recheck(this: &Arc<Self>, path: PathBuf) {
        let now = this.scheduler.now();
        let quiet = {
            let mut suppressions = this.suppressions.lock();
            let quiet = match suppressions.get(&path) {
                Some(entry) => {
                    !entry.in_progress && now.saturating_duration_since(entry.last_activity) >= this.window
                }
                None => true,
            };
            if quiet {
                suppressions.remove(&path);
            }
            quiet
        };

        if quiet {
            this.watch.enable_watch(&this.watch_directory, &this.file_pattern);
            metrics::record_watcher_suppressed(&this.watch_directory, false);
            tracing::info!(
                directory = ?this.watch_directory,
                pattern = %this.file_pattern,
                "Watcher re-enabled after quiet window"
            );
        } else {
            tracing::debug!(path = ?path, "Recent save activity, watcher stays disabled");
            Self::schedule_recheck(this, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SectionKey;
    use crate::document::ResolvedSection;
    use crate::paths::VirtualPath;
    use crate::save::scheduler::ManualScheduler;

    #[derive(Default)]
    struct RecordingWatch {
        calls: Mutex<Vec<(&'static str, PathBuf, String)>>,
    }

    impl RecordingWatch {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().iter().map(|(kind, _, _)| *kind).collect()
        }
    }

    impl WatchControl for RecordingWatch {
        fn disable_watch(&self, directory: &Path, file_pattern: &str) {
            self.calls.lock().push(("disable", directory.to_path_buf(), file_pattern.to_string()));
        }

        fn enable_watch(&self, directory: &Path, file_pattern: &str) {
            self.calls.lock().push(("enable", directory.to_path_buf(), file_pattern.to_string()));
        }
    }

    struct Fixture {
        cache: Arc<SectionCache>,
        watch: Arc<RecordingWatch>,
        scheduler: Arc<ManualScheduler>,
        coordinator: SaveCoordinator,
    }

    const PRIMARY: &str = "/srv/app/web.toml";

    fn fixture() -> Fixture {
        let cache = Arc::new(SectionCache::new(8, Duration::from_millis(200)));
        let watch = Arc::new(RecordingWatch::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let coordinator = SaveCoordinator::new(cache.clone(), PRIMARY, watch.clone(), scheduler.clone());
        Fixture {
            cache,
            watch,
            scheduler,
            coordinator,
        }
    }

    fn fill(cache: &SectionCache) {
        let path = VirtualPath::new("/app");
        cache.add(
            SectionKey::document("s", &path),
            Arc::new(ResolvedSection::new("s", path, None, toml::Value::Integer(1), Arc::new(1i64))),
        );
    }

    fn save(coordinator: &SaveCoordinator, path: &str) {
        coordinator.handle(&SaveEvent::start(path));
        coordinator.handle(&SaveEvent::end(path));
    }

    #[test]
    fn test_every_save_clears_cache() {
        let f = fixture();
        fill(&f.cache);
        f.coordinator.handle(&SaveEvent::start("/etc/machine.toml"));
        assert!(f.cache.is_empty());

        fill(&f.cache);
        f.coordinator.handle(&SaveEvent::end("/etc/machine.toml"));
        assert!(f.cache.is_empty());
    }

    #[test]
    fn test_secondary_document_skips_suppression() {
        let f = fixture();
        save(&f.coordinator, "/srv/app/sub/web.toml");
        assert!(f.watch.calls().is_empty());
        assert!(!f.coordinator.is_watch_suppressed());
        assert_eq!(f.scheduler.pending_count(), 0);
    }

    #[test]
    fn test_reload_suppressed_during_primary_save() {
        let f = fixture();
        f.coordinator.handle(&SaveEvent::start(PRIMARY));
        assert!(f.coordinator.is_reload_suppressed());
        f.coordinator.handle(&SaveEvent::end(PRIMARY));
        assert!(!f.coordinator.is_reload_suppressed());
    }

    #[test]
    fn test_watch_reenabled_after_quiet_window() {
        let f = fixture();
        save(&f.coordinator, PRIMARY);

        let calls = f.watch.calls.lock().clone();
        assert_eq!(calls, vec![("disable", PathBuf::from("/srv/app"), DEFAULT_FILE_PATTERN.to_string())]);

        f.scheduler.advance(Duration::from_millis(5999));
        assert_eq!(f.watch.calls(), vec!["disable"]);

        f.scheduler.advance(Duration::from_millis(1));
        assert_eq!(f.watch.calls(), vec!["disable", "enable"]);
        assert!(!f.coordinator.is_watch_suppressed());
    }

    #[test]
    fn test_repeated_saves_push_reenable_forward() {
        let f = fixture();
        for _ in 0..4 {
            save(&f.coordinator, PRIMARY);
            f.scheduler.advance(Duration::from_secs(2));
        }
        // Last save at t=6s; rechecks at 6s and 12s.
        assert_eq!(f.watch.calls(), vec!["disable"]);
        assert!(f.coordinator.is_watch_suppressed());

        f.scheduler.advance(Duration::from_secs(3));
        assert_eq!(f.watch.calls(), vec!["disable"]);

        f.scheduler.advance(Duration::from_secs(1));
        assert_eq!(f.watch.calls(), vec!["disable", "enable"]);
    }

    #[test]
    fn test_save_in_progress_blocks_reenable() {
        let f = fixture();
        f.coordinator.handle(&SaveEvent::start(PRIMARY));
        f.scheduler.advance(Duration::from_secs(30));
        assert_eq!(f.watch.calls(), vec!["disable"]);

        f.coordinator.handle(&SaveEvent::end(PRIMARY));
        f.scheduler.advance(Duration::from_secs(12));
        assert_eq!(f.watch.calls(), vec!["disable", "enable"]);
    }

    #[test]
    fn test_callbacks_run_in_order_after_clear() {
        let f = fixture();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            let cache = f.cache.clone();
            f.coordinator.subscribe(move |event: &SaveEvent| {
                assert!(cache.is_empty());
                log.lock().push((name, event.is_start));
            });
        }

        fill(&f.cache);
        save(&f.coordinator, "/srv/app/sub/web.toml");
        assert_eq!(
            *log.lock(),
            vec![("first", true), ("second", true), ("first", false), ("second", false)]
        );
    }

    #[test]
    fn test_callback_may_subscribe_during_dispatch() {
        let f = fixture();
        let log = Arc::new(Mutex::new(Vec::new()));
        let subscribed = Arc::new(AtomicBool::new(false));

        let coordinator = f.coordinator.clone();
        let outer_log = log.clone();
        f.coordinator.subscribe(move |event: &SaveEvent| {
            outer_log.lock().push(("outer", event.is_start));
            if !subscribed.swap(true, Ordering::SeqCst) {
                let inner_log = outer_log.clone();
                coordinator.subscribe(move |event: &SaveEvent| inner_log.lock().push(("inner", event.is_start)));
            }
        });

        save(&f.coordinator, "/srv/app/sub/web.toml");
        assert_eq!(
            *log.lock(),
            vec![("outer", true), ("outer", false), ("inner", false)]
        );
    }

    #[test]
    fn test_dropped_coordinator_cancels_recheck() {
        let f = fixture();
        save(&f.coordinator, PRIMARY);
        drop(f.coordinator);
        f.scheduler.advance(Duration::from_secs(10));
        assert_eq!(f.watch.calls(), vec!["disable"]);
    }
}
