//! Watcher debounce on the tokio timer.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingWatch, Site};
use confpath::save::TokioScheduler;
use confpath::{DocumentContent, SectionRegistry};

#[tokio::test(start_paused = true)]
async fn test_rapid_saves_keep_watcher_disabled_until_quiet() {
    let site = Site::new();
    site.document("app", "");
    let watch = Arc::new(RecordingWatch::default());
    let engine = site.engine_with(SectionRegistry::new(), watch.clone(), Arc::new(TokioScheduler::current()));

    // Saves at t=0s, 2s and 4s; the first recheck (t=6s) sees recent
    // activity and moves to t=12s.
    for _ in 0..3 {
        engine.save_document("/app", &DocumentContent::new()).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    assert_eq!(watch.kinds(), vec!["disable"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(watch.kinds(), vec!["disable"]);
    assert!(engine.coordinator().is_watch_suppressed());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(watch.kinds(), vec!["disable", "enable"]);
    assert!(!engine.coordinator().is_watch_suppressed());
}

#[tokio::test(start_paused = true)]
async fn test_single_save_restores_after_one_window() {
    let site = Site::new();
    site.document("app", "");
    let watch = Arc::new(RecordingWatch::default());
    let engine = site.engine_with(SectionRegistry::new(), watch.clone(), Arc::new(TokioScheduler::current()));

    engine.save_document("/app", &DocumentContent::new()).unwrap();

    tokio::time::sleep(Duration::from_millis(5900)).await;
    assert_eq!(watch.kinds(), vec!["disable"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(watch.kinds(), vec!["disable", "enable"]);
}
