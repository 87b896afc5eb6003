//! Public types for the dual-write coordinator.

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Metadata;
use crate::mount::probe::HealthStatus;
use crate::mount::walk::FileEntry;
use crate::mount::writer::{serialize_secs, WriteResult};
use crate::mount::MountKind;
use super::stats::MetricsSnapshot;

/// Per-destination outcome of one dual write.
///
/// Both sub-results are always present. "Accepted" (either side succeeded)
/// and "fully replicated" are different questions; see
/// [`any_succeeded`](Self::any_succeeded) and
/// [`fully_replicated`](Self::fully_replicated).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualWriteResult {
    pub local: WriteResult,
    pub corebank: WriteResult,
}

impl DualWriteResult {
    /// Both destinations report the shared-deadline timeout.
    #[must_use]
    pub fn timed_out(secs: u64) -> Self {
        Self {
            local: WriteResult::timed_out(secs),
            corebank: WriteResult::timed_out(secs),
        }
    }

    #[must_use]
    pub fn get(&self, kind: MountKind) -> &WriteResult {
        match kind {
            MountKind::Local => &self.local,
            MountKind::Corebank => &self.corebank,
        }
    }

    /// Counted as a successful write in the coordinator metrics.
    #[must_use]
    pub fn any_succeeded(&self) -> bool {
        self.local.success || self.corebank.success
    }

    #[must_use]
    pub fn fully_replicated(&self) -> bool {
        self.local.success && self.corebank.success
    }

    /// Exactly one destination has the data.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.local.success != self.corebank.success
    }

    pub(crate) fn outcome_label(&self) -> &'static str {
        if self.fully_replicated() {
            "replicated"
        } else if self.any_succeeded() {
            "degraded"
        } else {
            "failed"
        }
    }
}

/// Aggregate health of both mounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    /// Local healthy, and corebank healthy unless dual write is off
    pub healthy: bool,
    pub dual_write_enabled: bool,
    pub local: HealthStatus,
    pub corebank: HealthStatus,
    pub metrics: MetricsSnapshot,
}

/// One item of a batch write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub filename: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl WriteRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Result of a batch write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful_writes: usize,
    pub failed_writes: usize,
    pub batches_processed: usize,
    pub errors: Vec<String>,
    #[serde(serialize_with = "serialize_secs")]
    pub total_duration: Duration,
    /// Files per second over the whole run
    pub throughput: f64,
}

impl BatchSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_writes == 0
    }
}

/// Result of a reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// True only if no file failed
    pub success: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub synced_files: usize,
    pub total_files: usize,
    pub files_synced: Vec<String>,
    pub errors: Vec<String>,
    /// Set when the sweep could not run at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recursive listing of one directory on one mount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileListing {
    pub success: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub mount: MountKind,
    /// Listed directory relative to the mount root; empty for the root
    pub path: String,
    pub files: Vec<FileEntry>,
    pub total: usize,
    /// Entries that could not be read; the rest of the listing still holds
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileListing {
    pub(crate) fn failed(mount: MountKind, path: &str, duration: Duration, error: String) -> Self {
        Self {
            success: false,
            duration,
            mount,
            path: path.to_string(),
            files: Vec::new(),
            total: 0,
            errors: Vec::new(),
            error: Some(error),
        }
    }
}
