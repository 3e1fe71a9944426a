//! Prometheus metric names and recording helpers.

use metrics::{counter, histogram};

pub const RUNS_TOTAL: &str = "tiler_runs_total";
pub const RUN_FAILURES_TOTAL: &str = "tiler_run_failures_total";
pub const TILES_TOTAL: &str = "tiler_tiles_total";
pub const RUN_DURATION_MS: &str = "tiler_run_duration_ms";
pub const DOWNLOADS_TOTAL: &str = "tiler_downloads_total";
pub const PURGED_RUNS_TOTAL: &str = "tiler_purged_runs_total";

/// A run finished and produced `tiles` tile files.
pub fn record_run_success(tiles: usize, duration_ms: f64) {
    counter!(RUNS_TOTAL).increment(1);
    counter!(TILES_TOTAL).increment(tiles as u64);
    histogram!(RUN_DURATION_MS).record(duration_ms);
}

/// A run failed; `code` is the error's stable code.
pub fn record_run_failure(code: &'static str) {
    counter!(RUNS_TOTAL).increment(1);
    counter!(RUN_FAILURES_TOTAL, "code" => code).increment(1);
}

/// An artifact was served; `kind` is its file extension.
pub fn record_download(kind: &'static str) {
    counter!(DOWNLOADS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_purge(removed: usize) {
    counter!(PURGED_RUNS_TOTAL).increment(removed as u64);
}
