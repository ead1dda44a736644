//! Layout metrics.
//!
//! Provides metrics for placement, lifecycle, and reaper operations.
//! These metrics complement the structured logging approach already in
//! place.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Tombstones purged by the reaper, labeled by entity kind.
pub const REAPER_PURGED: &str = "plaza_reaper_purged_total";

/// Reaper sweep duration histogram.
pub const REAPER_SWEEP_DURATION: &str = "plaza_reaper_sweep_duration_seconds";

/// Layout mutations, labeled by operation.
pub const LAYOUT_OPERATIONS: &str = "plaza_layout_operations_total";

/// Layout mutation failures, labeled by operation.
pub const LAYOUT_OPERATION_ERRORS: &str = "plaza_layout_operation_errors_total";

/// Registers all layout metric descriptions.
///
/// Call this once at application startup after initializing the metrics
/// recorder.
pub fn register_metrics() {
    describe_counter!(REAPER_PURGED, "Total tombstones purged by the reaper");
    describe_histogram!(REAPER_SWEEP_DURATION, "Duration of reaper sweeps in seconds");
    describe_counter!(LAYOUT_OPERATIONS, "Total layout mutations");
    describe_counter!(LAYOUT_OPERATION_ERRORS, "Total failed layout mutations");
}

/// Records the outcome of a reaper sweep.
pub fn record_sweep(trigger: &str, gadgets: u64, tabs: u64, templates: u64, duration_secs: f64) {
    counter!(REAPER_PURGED, "kind" => "gadget", "trigger" => trigger.to_string())
        .increment(gadgets);
    counter!(REAPER_PURGED, "kind" => "tab", "trigger" => trigger.to_string()).increment(tabs);
    counter!(REAPER_PURGED, "kind" => "tabTemplate", "trigger" => trigger.to_string())
        .increment(templates);
    histogram!(REAPER_SWEEP_DURATION, "trigger" => trigger.to_string()).record(duration_secs);
}

/// Records a completed layout mutation.
pub fn record_operation(operation: &'static str) {
    counter!(LAYOUT_OPERATIONS, "op" => operation).increment(1);
}

/// Records a failed layout mutation.
pub fn record_operation_error(operation: &'static str) {
    counter!(LAYOUT_OPERATION_ERRORS, "op" => operation).increment(1);
}
