//! Rolling write metrics owned by a coordinator.
//!
//! Counters only grow; nothing resets them for the coordinator's lifetime.
//! All updates go through one mutex so the counters and the running mean stay
//! consistent under concurrent dual writes.

use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Read-only copy of the coordinator metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_writes: u64,
    pub successful_writes: u64,
    pub failed_writes: u64,
    /// Running mean of whole dual-write wall-clock time, in seconds
    pub avg_write_time: f64,
    pub last_health_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct WriteMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl WriteMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one write attempt and fold its duration into the mean.
    pub fn record_write(&self, success: bool, duration: Duration) {
        let mut m = self.inner.lock();
        m.total_writes += 1;
        if success {
            m.successful_writes += 1;
        } else {
            m.failed_writes += 1;
        }
        let n = m.total_writes as f64;
        m.avg_write_time = (m.avg_write_time * (n - 1.0) + duration.as_secs_f64()) / n;
    }

    pub fn record_health_check(&self, at: DateTime<Utc>) {
        self.inner.lock().last_health_check = Some(at);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().clone()
    }
}
