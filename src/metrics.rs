// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the sync engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `weather_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `category`: weather, preferences, alert
//! - `status`: queued, rejected, error / synced, requeued

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::entry::SyncCategory;

/// Record an enqueue attempt outcome.
pub fn record_enqueue(category: SyncCategory, status: &'static str) {
    counter!(
        "weather_sync_enqueued_total",
        "category" => category.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Record the outcome of one entry's replay attempt.
pub fn record_entry_outcome(category: SyncCategory, status: &'static str) {
    counter!(
        "weather_sync_entries_total",
        "category" => category.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Record an entry permanently dropped after exhausting its retry budget.
pub fn record_dropped(category: SyncCategory) {
    counter!(
        "weather_sync_dropped_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Record the duration of one category's drain.
pub fn record_drain_duration(category: SyncCategory, duration: Duration) {
    histogram!(
        "weather_sync_drain_seconds",
        "category" => category.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record the duration of a full multi-category sync cycle.
pub fn record_cycle_duration(duration: Duration) {
    histogram!("weather_sync_cycle_seconds").record(duration.as_secs_f64());
}

/// Set the pending-entry gauge for a category.
pub fn set_pending(category: SyncCategory, count: u64) {
    gauge!(
        "weather_sync_pending_entries",
        "category" => category.as_str()
    )
    .set(count as f64);
}

/// Record a queue-store failure during drain bookkeeping.
pub fn record_store_error(operation: &'static str) {
    counter!(
        "weather_sync_store_errors_total",
        "operation" => operation
    )
    .increment(1);
}
