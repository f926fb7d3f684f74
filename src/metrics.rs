// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for paywall-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `paywall_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `entity`: paywall, product
//! - `source`: cache, fallback, none
//! - `status`: success, error, rejected

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record which layer answered a resolver query
pub fn record_resolution(entity: &str, source: &str) {
    counter!(
        "paywall_sync_resolutions_total",
        "entity" => entity.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
}

/// Record a fallback payload install attempt
pub fn record_fallback_install(status: &str) {
    counter!(
        "paywall_sync_fallback_installs_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an analytics event accepted into the buffer
pub fn record_event_buffered(event_name: &str) {
    counter!(
        "paywall_sync_events_buffered_total",
        "event" => event_name.to_string()
    )
    .increment(1);
}

/// Record an analytics event refused before buffering
pub fn record_event_rejected(reason: &str) {
    counter!(
        "paywall_sync_events_rejected_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a sync attempt outcome and how many records it carried
pub fn record_sync(status: &str, records: usize) {
    counter!(
        "paywall_sync_syncs_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "paywall_sync_sync_batch_size",
        "status" => status.to_string()
    )
    .record(records as f64);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "paywall_sync_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set current event buffer length
pub fn set_buffer_len(len: usize) {
    gauge!("paywall_sync_buffer_events").set(len as f64);
}

/// Record a request that could not be signed
pub fn record_signing_error(kind: &str) {
    counter!(
        "paywall_sync_signing_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a paywall configuration response (changed / unchanged)
pub fn record_configuration_response(outcome: &str) {
    counter!(
        "paywall_sync_configuration_responses_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Records the elapsed time for an operation when dropped
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
