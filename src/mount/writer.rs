// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable single-mount writes.
//!
//! [`WriteExecutor::write`] persists one logical record to one mount:
//! parent directories are created, the payload is optionally wrapped in a
//! [`WriteEnvelope`](crate::envelope::WriteEnvelope), and the file is
//! flushed and `fsync`ed before success is reported. Failures never escape as
//! errors; they come back as a failed [`WriteResult`].

use std::sync::Arc;
use std::time::{Duration, Instant};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, error};

use crate::envelope::{encode_payload, Metadata};
use super::{ensure_parent, run_blocking, write_durable, IoPool, Mount, MountError};

/// Why a destination did not receive a write.
///
/// Timeouts and the disabled policy are separate kinds so callers can tell a
/// slow destination from a broken one, and a broken one from a skipped one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("{0}")]
    Io(String),
    #[error("Dual write timeout after {secs}s")]
    Timeout { secs: u64 },
    #[error("Dual write disabled")]
    Disabled,
    #[error("{0}")]
    TaskFailed(String),
}

impl WriteError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl Serialize for WriteError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Outcome of one (file, mount) write attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    pub success: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub bytes_written: usize,
    pub error: Option<WriteError>,
}

impl WriteResult {
    #[must_use]
    pub fn succeeded(duration: Duration, bytes_written: usize) -> Self {
        Self { success: true, duration, bytes_written, error: None }
    }

    #[must_use]
    pub fn failed(error: WriteError) -> Self {
        Self { success: false, duration: Duration::ZERO, bytes_written: 0, error: Some(error) }
    }

    /// Result reported when the shared deadline expired; duration is the budget.
    #[must_use]
    pub fn timed_out(secs: u64) -> Self {
        Self {
            success: false,
            duration: Duration::from_secs(secs),
            bytes_written: 0,
            error: Some(WriteError::Timeout { secs }),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::failed(WriteError::Disabled)
    }
}

/// Writes records to a mount on the bounded blocking pool.
#[derive(Debug)]
pub struct WriteExecutor {
    buffer_size: usize,
    io: Arc<IoPool>,
}

impl WriteExecutor {
    pub fn new(buffer_size: usize, io: Arc<IoPool>) -> Self {
        Self { buffer_size, io }
    }

    /// Write `content` to `filename` under `mount`.
    ///
    /// Non-empty `metadata` wraps the content in an envelope; otherwise the
    /// content is written unmodified. `bytes_written` counts the exact bytes
    /// put on disk.
    pub async fn write(
        &self,
        mount: &Mount,
        filename: &str,
        content: &str,
        metadata: Option<&Metadata>,
    ) -> WriteResult {
        let start = Instant::now();
        let outcome = match encode_payload(content, metadata) {
            Ok(payload) => self.persist(mount, filename, payload.into()).await,
            Err(e) => Err(MountError::from(e)),
        };
        Self::finish(mount, filename, start, outcome)
    }

    /// Write already-encoded bytes with no envelope handling.
    ///
    /// The coordinator encodes once and hands the same bytes to both mounts.
    pub async fn write_bytes(&self, mount: &Mount, filename: &str, payload: Arc<[u8]>) -> WriteResult {
        let start = Instant::now();
        let outcome = self.persist(mount, filename, payload).await;
        Self::finish(mount, filename, start, outcome)
    }

    /// Create parents, write, flush, `fsync`. Returns the byte count.
    pub(crate) async fn persist(
        &self,
        mount: &Mount,
        filename: &str,
        payload: Arc<[u8]>,
    ) -> Result<usize, MountError> {
        let path = mount.resolve(filename)?;
        let buffer_size = self.buffer_size;
        run_blocking(self.io.permits(mount.kind()), move || {
            ensure_parent(&path)?;
            write_durable(&path, &payload, buffer_size)
        })
        .await
    }

    fn finish(
        mount: &Mount,
        filename: &str,
        start: Instant,
        outcome: Result<usize, MountError>,
    ) -> WriteResult {
        match outcome {
            Ok(bytes) => {
                let duration = start.elapsed();
                debug!(mount = mount.name(), filename, bytes, ?duration, "Write persisted");
                crate::metrics::record_write(mount.name(), true, duration, bytes);
                WriteResult::succeeded(duration, bytes)
            }
            Err(e) => {
                error!(mount = mount.name(), root = %mount.root().display(), filename, error = %e, "Write failed");
                crate::metrics::record_write(mount.name(), false, Duration::ZERO, 0);
                let error = match e {
                    MountError::TaskFailed(msg) => WriteError::TaskFailed(msg),
                    other => WriteError::Io(other.to_string()),
                };
                WriteResult::failed(error)
            }
        }
    }
}
