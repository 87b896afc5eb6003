// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Mount health probe.
//!
//! One probe is a full round trip against the mount root:
//!
//! ```text
//! write + fsync → read back → byte-compare → delete
//! ```
//!
//! Latency covers the whole round trip, cleanup included, but not time spent
//! waiting for an I/O worker. A read-back that
//! differs from what was written is an integrity failure, not just an I/O
//! error. Probe files always carry [`PROBE_FILE_PREFIX`] so the
//! reconciliation sweep can skip any that survive a crash.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::{run_blocking, write_durable, IoPool, Mount, MountError};

/// File name prefix shared by every probe file.
pub const PROBE_FILE_PREFIX: &str = "health_check_";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Data integrity check failed")]
    Integrity,
    #[error("Health check timeout after {secs}s")]
    Timeout { secs: u64 },
    #[error("{0}")]
    Io(String),
}

impl Serialize for ProbeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Health of one mount at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: f64,
    pub writable: bool,
    pub readable: bool,
    pub mount_path: PathBuf,
    pub error: Option<ProbeError>,
}

impl HealthStatus {
    /// A probe abandoned at the deadline. Nothing is known to have worked.
    #[must_use]
    pub fn timed_out(mount: &Mount, secs: u64) -> Self {
        Self {
            healthy: false,
            latency_ms: Duration::from_secs(secs).as_secs_f64() * 1000.0,
            writable: false,
            readable: false,
            mount_path: mount.root().to_path_buf(),
            error: Some(ProbeError::Timeout { secs }),
        }
    }
}

#[derive(Debug, Default)]
struct RoundTrip {
    writable: bool,
    readable: bool,
    error: Option<ProbeError>,
    latency: Duration,
}

/// Runs write/read/verify/delete round trips against mounts.
#[derive(Debug)]
pub struct MountProbe {
    buffer_size: usize,
    io: Arc<IoPool>,
}

impl MountProbe {
    pub fn new(buffer_size: usize, io: Arc<IoPool>) -> Self {
        Self { buffer_size, io }
    }

    pub async fn probe(&self, mount: &Mount) -> HealthStatus {
        let root = mount.root().to_path_buf();
        let name = mount.name();
        let buffer_size = self.buffer_size;

        let round_trip = run_blocking(self.io.permits(mount.kind()), move || {
            Ok(round_trip(&root, name, buffer_size))
        })
        .await
        .unwrap_or_else(|e| RoundTrip {
            error: Some(ProbeError::Io(e.to_string())),
            ..RoundTrip::default()
        });
        let latency_ms = (round_trip.latency.as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

        let healthy = round_trip.writable && round_trip.readable && round_trip.error.is_none();
        if let Some(ref e) = round_trip.error {
            error!(mount = name, root = %mount.root().display(), error = %e, "Health check failed");
        }
        crate::metrics::record_probe(name, healthy, latency_ms);

        HealthStatus {
            healthy,
            latency_ms,
            writable: round_trip.writable,
            readable: round_trip.readable,
            mount_path: mount.root().to_path_buf(),
            error: round_trip.error,
        }
    }
}

/// Name a probe file. Time plus a random suffix keeps concurrent probes,
/// including ones from other processes, from colliding.
fn probe_file_name(mount_name: &str) -> String {
    format!(
        "{}{}_{}_{}.tmp",
        PROBE_FILE_PREFIX,
        mount_name,
        Utc::now().timestamp_micros(),
        Uuid::new_v4().simple()
    )
}

fn verify(expected: &[u8], actual: &[u8]) -> Result<(), ProbeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProbeError::Integrity)
    }
}

fn round_trip(root: &Path, mount_name: &str, buffer_size: usize) -> RoundTrip {
    let path = root.join(probe_file_name(mount_name));
    let payload = format!("health_check_{}_{}", mount_name, Utc::now().to_rfc3339());
    let mut outcome = RoundTrip::default();
    let start = Instant::now();

    match write_durable(&path, payload.as_bytes(), buffer_size) {
        Ok(_) => {
            outcome.writable = true;
            match fs::read(&path) {
                Ok(read_back) => {
                    outcome.readable = true;
                    if let Err(e) = verify(payload.as_bytes(), &read_back) {
                        outcome.error = Some(e);
                    }
                }
                Err(e) => outcome.error = Some(ProbeError::Io(MountError::io(&path, e).to_string())),
            }
        }
        Err(e) => outcome.error = Some(ProbeError::Io(e.to_string())),
    }

    // A failed create may still have left a file behind, so always try.
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound && !outcome.writable => {}
        Err(e) => {
            warn!(mount = mount_name, path = %path.display(), error = %e, "Failed to remove probe file");
            crate::metrics::record_probe_cleanup_failure(mount_name);
        }
    }

    outcome.latency = start.elapsed();
    outcome
}
