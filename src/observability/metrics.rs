//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define engine metrics (cache traffic, watcher state, path resolution)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `confpath_section_cache_hits_total` (counter)
//! - `confpath_section_cache_misses_total` (counter)
//! - `confpath_section_cache_evictions_total` (counter)
//! - `confpath_section_cache_clears_total` (counter)
//! - `confpath_section_cache_skipped_inserts_total` (counter): lock timeouts
//! - `confpath_section_cache_entries` (gauge)
//! - `confpath_watcher_suppressed` (gauge): 1=suppressed, 0=watching, by directory
//! - `confpath_path_resolutions_total` (counter): by outcome
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Recording is a no-op until `init_metrics` installs the exporter

use std::net::SocketAddr;
use std::path::Path;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_hit() {
    metrics::counter!("confpath_section_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("confpath_section_cache_misses_total").increment(1);
}

pub fn record_cache_eviction() {
    metrics::counter!("confpath_section_cache_evictions_total").increment(1);
}

pub fn record_cache_clear() {
    metrics::counter!("confpath_section_cache_clears_total").increment(1);
}

pub fn record_cache_skipped_insert() {
    metrics::counter!("confpath_section_cache_skipped_inserts_total").increment(1);
}

pub fn record_cache_entries(entries: usize) {
    metrics::gauge!("confpath_section_cache_entries").set(entries as f64);
}

pub fn record_watcher_suppressed(directory: &Path, suppressed: bool) {
    metrics::gauge!(
        "confpath_watcher_suppressed",
        "directory" => directory.display().to_string()
    )
    .set(if suppressed { 1.0 } else { 0.0 });
}

/// `outcome` is one of `cached`, `walked`, `unmapped`.
pub fn record_path_resolution(outcome: &'static str) {
    metrics::counter!("confpath_path_resolutions_total", "outcome" => outcome).increment(1);
}
