// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for dual-mount-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! This is internal instrumentation. The fixed sample vocabulary reported to
//! an external collector lives in [`crate::sink`].
//!
//! # Metric Naming Convention
//! - `dual_mount_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size counters
//!
//! # Labels
//! - `mount`: local, corebank
//! - `operation`: write, probe, dual_write, batch, reconcile
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a single-mount write attempt
pub fn record_write(mount: &str, success: bool, duration: Duration, bytes: usize) {
    let status = if success { "success" } else { "error" };
    counter!(
        "dual_mount_writes_total",
        "mount" => mount.to_string(),
        "status" => status
    )
    .increment(1);
    if success {
        histogram!("dual_mount_write_seconds", "mount" => mount.to_string())
            .record(duration.as_secs_f64());
        counter!("dual_mount_bytes_written_total", "mount" => mount.to_string())
            .increment(bytes as u64);
    }
}

/// Record the outcome of a whole dual write: replicated, degraded or failed
pub fn record_dual_write(outcome: &str, duration: Duration) {
    counter!("dual_mount_dual_writes_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("dual_mount_dual_write_seconds").record(duration.as_secs_f64());
}

/// Record a shared-deadline expiry
pub fn record_timeout(operation: &str) {
    counter!(
        "dual_mount_timeouts_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a per-destination task that panicked or was cancelled
pub fn record_task_failure(mount: &str) {
    counter!("dual_mount_task_failures_total", "mount" => mount.to_string()).increment(1);
}

/// Record a health probe result
pub fn record_probe(mount: &str, healthy: bool, latency_ms: f64) {
    gauge!("dual_mount_healthy", "mount" => mount.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
    histogram!("dual_mount_probe_seconds", "mount" => mount.to_string())
        .record(latency_ms / 1000.0);
}

/// Record a probe file that could not be removed
pub fn record_probe_cleanup_failure(mount: &str) {
    counter!("dual_mount_probe_cleanup_failures_total", "mount" => mount.to_string()).increment(1);
}

/// Record a processed batch chunk
pub fn record_batch(size: usize, succeeded: usize) {
    histogram!("dual_mount_batch_size").record(size as f64);
    counter!("dual_mount_batch_items_total", "status" => "success").increment(succeeded as u64);
    counter!("dual_mount_batch_items_total", "status" => "error")
        .increment(size.saturating_sub(succeeded) as u64);
}

/// Record a file copied to corebank by the reconciliation sweep
pub fn record_reconciled_file(bytes: usize) {
    counter!("dual_mount_reconciled_files_total").increment(1);
    counter!("dual_mount_reconciled_bytes_total").increment(bytes as u64);
}

/// Record a file the reconciliation sweep failed to copy
pub fn record_reconcile_error() {
    counter!("dual_mount_reconcile_errors_total").increment(1);
}

/// Record a sample the external sink refused
pub fn record_sink_failure(sample: &'static str) {
    counter!("dual_mount_sink_failures_total", "sample" => sample).increment(1);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    mount: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(mount: &'static str, operation: &'static str) -> Self {
        Self {
            mount,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(
            "dual_mount_operation_seconds",
            "mount" => self.mount,
            "operation" => self.operation
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}
