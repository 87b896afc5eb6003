// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Dual-write coordinator.
//!
//! The [`DualWriteCoordinator`] ties the components together:
//! - [`WriteExecutor`] for durable single-mount writes
//! - [`MountProbe`] for health round trips
//! - [`WriteMetrics`] for rolling counters
//! - an injected [`MetricsSink`] for external samples
//!
//! # Write path
//!
//! ```text
//! encode once ─┬── spawn(local write) ────┐
//!              └── spawn(corebank write) ─┴── join within sync_timeout ──→ DualWriteResult
//!                                                   │
//!                                    timeout: abort both, report Timeout
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dual_mount_sync::{DualMountConfig, DualWriteCoordinator};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = DualMountConfig::from_env().expect("bad config");
//! let coordinator = DualWriteCoordinator::new(config).expect("mounts unavailable");
//!
//! let result = coordinator.write_data("ledger/txn-1.json", "{}", None).await;
//! if result.is_degraded() {
//!     // Run a reconciliation sweep once corebank is back
//! }
//! # }
//! ```

mod types;
mod stats;
mod health;
mod batch;
mod reconcile;
mod listing;

pub use types::{DualWriteResult, HealthReport, WriteRequest, BatchSummary, SyncReport, FileListing};
pub use stats::{WriteMetrics, MetricsSnapshot};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::config::DualMountConfig;
use crate::envelope::{encode_payload, Metadata};
use crate::mount::probe::MountProbe;
use crate::mount::writer::{WriteError, WriteExecutor, WriteResult};
use crate::mount::{IoPool, Mount, MountError, MountKind};
use crate::sink::{self, FacadeSink, MetricSample, MetricsSink, SampleName};

/// Coordinates durable writes to the local and corebank mounts.
///
/// # Thread Safety
///
/// The coordinator is `Send + Sync` and cheap to clone: clones share the
/// same mounts, worker pool, metrics and sink.
#[derive(Clone)]
pub struct DualWriteCoordinator {
    pub(super) config: Arc<DualMountConfig>,
    pub(super) local: Mount,
    pub(super) corebank: Mount,
    pub(super) io: Arc<IoPool>,
    pub(super) executor: Arc<WriteExecutor>,
    pub(super) probe: Arc<MountProbe>,
    pub(super) metrics: Arc<WriteMetrics>,
    pub(super) sink: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for DualWriteCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualWriteCoordinator")
            .field("local", &self.local)
            .field("corebank", &self.corebank)
            .field("dual_write_enabled", &self.config.dual_write_enabled)
            .finish_non_exhaustive()
    }
}

impl DualWriteCoordinator {
    /// Create a coordinator, creating both mount roots if needed.
    ///
    /// This is the only fallible operation: a config that fails validation
    /// or a mount root that cannot be created stops startup.
    pub fn new(config: DualMountConfig) -> Result<Self, MountError> {
        config.validate()?;

        let local = Mount::new(MountKind::Local, config.local_mount.clone());
        let corebank = Mount::new(MountKind::Corebank, config.corebank_mount.clone());
        for mount in [&local, &corebank] {
            mount.ensure_root().inspect_err(|e| {
                error!(mount = mount.name(), error = %e, "Failed to create mount directory");
            })?;
        }

        let io = Arc::new(IoPool::new(config.io_workers));

        info!(
            local = %local.root().display(),
            corebank = %corebank.root().display(),
            sync_timeout_secs = config.sync_timeout_secs,
            dual_write_enabled = config.dual_write_enabled,
            io_workers = config.io_workers,
            "Initialized dual-write coordinator"
        );

        Ok(Self {
            executor: Arc::new(WriteExecutor::new(config.buffer_size, Arc::clone(&io))),
            probe: Arc::new(MountProbe::new(config.buffer_size, Arc::clone(&io))),
            io,
            config: Arc::new(config),
            local,
            corebank,
            metrics: Arc::new(WriteMetrics::new()),
            sink: Arc::new(FacadeSink),
        })
    }

    /// Replace the metrics sink (default: [`FacadeSink`]).
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DualMountConfig {
        &self.config
    }

    #[must_use]
    pub fn mount(&self, kind: MountKind) -> &Mount {
        match kind {
            MountKind::Local => &self.local,
            MountKind::Corebank => &self.corebank,
        }
    }

    /// Snapshot of the rolling write metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Write one logical record to both mounts.
    ///
    /// Never fails: every outcome, including timeouts and panicked write
    /// tasks, is reported per destination. A write counts as successful in
    /// the metrics if either destination succeeded.
    ///
    /// The payload (envelope included) is encoded once, so both mounts get
    /// byte-identical files.
    pub async fn write_data(
        &self,
        filename: &str,
        content: &str,
        metadata: Option<&Metadata>,
    ) -> DualWriteResult {
        let start = Instant::now();

        let result = match encode_payload(content, metadata) {
            Ok(payload) => {
                let payload: Arc<[u8]> = payload.into();
                if self.config.dual_write_enabled {
                    self.write_both(filename, payload).await
                } else {
                    self.write_local_only(filename, payload).await
                }
            }
            Err(e) => self.unencodable(filename, MountError::from(e)),
        };

        let duration = start.elapsed();
        self.metrics.record_write(result.any_succeeded(), duration);
        crate::metrics::record_dual_write(result.outcome_label(), duration);

        info!(
            filename,
            duration_ms = duration.as_millis() as u64,
            local = result.local.success,
            corebank = result.corebank.success,
            "Dual write completed"
        );

        sink::emit(
            self.sink.as_ref(),
            &[
                MetricSample::new(SampleName::DualWriteLatency, duration.as_secs_f64() * 1000.0),
                MetricSample::new(
                    SampleName::DualWriteSuccessRate,
                    if result.any_succeeded() { 100.0 } else { 0.0 },
                ),
                MetricSample::flag(SampleName::LocalWriteSuccess, result.local.success),
                MetricSample::flag(SampleName::CoreBankWriteSuccess, result.corebank.success),
            ],
        );

        result
    }

    /// Read a file back from one mount.
    pub async fn read_data(&self, filename: &str, from: MountKind) -> Result<String, MountError> {
        let path = self.mount(from).resolve(filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MountError::NotFound(filename.to_string()))
            }
            Err(e) => Err(MountError::io(path, e)),
        }
    }

    async fn write_both(&self, filename: &str, payload: Arc<[u8]>) -> DualWriteResult {
        let mut local_task = self.spawn_write(MountKind::Local, filename, Arc::clone(&payload));
        let mut corebank_task = self.spawn_write(MountKind::Corebank, filename, payload);

        let joined = self
            .within_deadline(async { tokio::join!(&mut local_task, &mut corebank_task) })
            .await;

        match joined {
            Some((local, corebank)) => DualWriteResult {
                local: settle(MountKind::Local, local),
                corebank: settle(MountKind::Corebank, corebank),
            },
            None => {
                local_task.abort();
                corebank_task.abort();
                self.timed_out(filename)
            }
        }
    }

    async fn write_local_only(&self, filename: &str, payload: Arc<[u8]>) -> DualWriteResult {
        let mut local_task = self.spawn_write(MountKind::Local, filename, payload);

        match self.within_deadline(&mut local_task).await {
            Some(local) => DualWriteResult {
                local: settle(MountKind::Local, local),
                corebank: WriteResult::disabled(),
            },
            None => {
                local_task.abort();
                DualWriteResult {
                    corebank: WriteResult::disabled(),
                    ..self.timed_out(filename)
                }
            }
        }
    }

    fn unencodable(&self, filename: &str, e: MountError) -> DualWriteResult {
        error!(filename, error = %e, "Failed to encode write payload");
        let failed = WriteResult::failed(WriteError::Io(e.to_string()));
        DualWriteResult {
            corebank: if self.config.dual_write_enabled {
                failed.clone()
            } else {
                WriteResult::disabled()
            },
            local: failed,
        }
    }

    fn timed_out(&self, filename: &str) -> DualWriteResult {
        let secs = self.config.sync_timeout_secs;
        let result = DualWriteResult::timed_out(secs);
        error!(filename, error = %WriteError::Timeout { secs }, "Dual write abandoned");
        crate::metrics::record_timeout("dual_write");
        result
    }

    fn spawn_write(&self, kind: MountKind, filename: &str, payload: Arc<[u8]>) -> JoinHandle<WriteResult> {
        let executor = Arc::clone(&self.executor);
        let mount = self.mount(kind).clone();
        let filename = filename.to_owned();
        tokio::spawn(async move { executor.write_bytes(&mount, &filename, payload).await })
    }

    /// Drive `fut` under the shared deadline; `None` when it elapses.
    ///
    /// A zero budget has always elapsed, so `fut` is never polled.
    pub(super) async fn within_deadline<F: Future>(&self, fut: F) -> Option<F::Output> {
        let budget = self.config.sync_timeout();
        if budget.is_zero() {
            return None;
        }
        tokio::time::timeout(budget, fut).await.ok()
    }
}

/// Turn a joined write task into a result; a panic becomes a failed write.
fn settle(kind: MountKind, joined: Result<WriteResult, JoinError>) -> WriteResult {
    match joined {
        Ok(result) => result,
        Err(e) => {
            let message = join_error_text(e);
            error!(mount = kind.as_str(), error = %message, "Write task failed");
            crate::metrics::record_task_failure(kind.as_str());
            WriteResult::failed(WriteError::TaskFailed(message))
        }
    }
}

pub(super) fn join_error_text(e: JoinError) -> String {
    if e.is_panic() {
        let panic = e.into_panic();
        if let Some(s) = panic.downcast_ref::<&str>() {
            format!("write task panicked: {s}")
        } else if let Some(s) = panic.downcast_ref::<String>() {
            format!("write task panicked: {s}")
        } else {
            "write task panicked".to_string()
        }
    } else {
        e.to_string()
    }
}
