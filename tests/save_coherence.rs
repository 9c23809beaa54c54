//! Cached sections never outlive a save of their document.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{table, RecordingWatch, Site};
use confpath::save::ManualScheduler;
use confpath::{DocumentContent, Engine, LocationOverride, SectionRegistry};

struct Harness {
    site: Site,
    engine: Engine,
    watch: Arc<RecordingWatch>,
    scheduler: Arc<ManualScheduler>,
}

fn harness() -> Harness {
    let site = Site::new();
    site.document("app", "[timeout]\nseconds = 30\n")
        .document("app/sub", "[pages]\nbuffer = true\n");
    let watch = Arc::new(RecordingWatch::default());
    let scheduler = Arc::new(ManualScheduler::new());
    let engine = site.engine_with(SectionRegistry::new(), watch.clone(), scheduler.clone());
    Harness {
        site,
        engine,
        watch,
        scheduler,
    }
}

fn timeout(seconds: i64) -> DocumentContent {
    DocumentContent::new().with_section("timeout", table(&format!("seconds = {seconds}")))
}

#[test]
fn test_save_of_primary_document_is_visible() {
    let h = harness();
    let before = h.engine.get_section("timeout", "/app/page", None).unwrap().unwrap();
    assert_eq!(before.raw(), &table("seconds = 30"));
    assert_eq!(h.engine.cache().len(), 1);

    h.engine.save_document("/app", &timeout(5)).unwrap();
    assert!(h.engine.cache().is_empty());

    let after = h.engine.get_section("timeout", "/app/page", None).unwrap().unwrap();
    assert_eq!(after.raw(), &table("seconds = 5"));
    assert!(!h.engine.coordinator().is_reload_suppressed());
}

#[test]
fn test_save_of_child_document_is_visible() {
    let h = harness();
    let inherited = h.engine.get_section("timeout", "/app/sub/page", None).unwrap().unwrap();
    assert_eq!(inherited.raw(), &table("seconds = 30"));

    h.engine.save_document("/app/sub/", &timeout(90)).unwrap();
    assert!(std::fs::read_to_string(h.site.path("app/sub/web.toml")).unwrap().contains("90"));

    let own = h.engine.get_section("timeout", "/app/sub/page", None).unwrap().unwrap();
    assert_eq!(own.raw(), &table("seconds = 90"));

    // A child document never suppresses the application watcher.
    assert!(h.watch.kinds().is_empty());
}

#[test]
fn test_saved_override_takes_effect() {
    let h = harness();
    assert_eq!(
        h.engine.get_section("timeout", "/app/admin/users", None).unwrap().unwrap().raw(),
        &table("seconds = 30")
    );

    let content = timeout(30).with_location(LocationOverride::new("admin").with_section("timeout", table("seconds = 1")));
    h.engine.save_document("/app", &content).unwrap();

    let admin = h.engine.get_section("timeout", "/app/admin/users", None).unwrap().unwrap();
    assert_eq!(admin.raw(), &table("seconds = 1"));
    let public = h.engine.get_section("timeout", "/app/public", None).unwrap().unwrap();
    assert_eq!(public.raw(), &table("seconds = 30"));
}

#[test]
fn test_primary_save_suppresses_then_restores_watcher() {
    let h = harness();
    h.engine.save_document("/app", &timeout(5)).unwrap();

    assert_eq!(h.watch.kinds(), vec!["disable"]);
    assert_eq!(h.watch.directories(), vec![h.site.app_root()]);
    assert!(h.engine.coordinator().is_watch_suppressed());

    h.scheduler.advance(Duration::from_millis(h.engine.config().watcher.debounce_ms));
    assert_eq!(h.watch.kinds(), vec!["disable", "enable"]);
    assert!(!h.engine.coordinator().is_watch_suppressed());
}

#[test]
fn test_callbacks_observe_saves() {
    let h = harness();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = seen.clone();
    h.engine.coordinator().subscribe(move |event| log.lock().push(event.is_start));

    h.engine.save_document("/app", &timeout(5)).unwrap();
    assert_eq!(*seen.lock(), vec![true, false]);
}

#[test]
fn test_save_outside_any_mapping_fails() {
    let h = harness();
    assert!(h.engine.save_document("/nowhere", &timeout(1)).is_err());
    assert!(h.watch.kinds().is_empty());
}
