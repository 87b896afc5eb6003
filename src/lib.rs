//! # Dual Mount Sync
//!
//! A dual-destination durable-write coordinator. Every logical write is
//! persisted to two independent storage mounts, a **local** mount and a
//! cross-account **corebank** mount, and the outcome is reported per
//! destination.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DualWriteCoordinator                     │
//! │  • write_data(): both mounts in parallel, shared deadline   │
//! │  • batch_write(): fixed-size chunks, one deadline per chunk │
//! │  • health_check(): concurrent mount probes                  │
//! │  • sync_missing_files(): local → corebank recovery          │
//! │  • list_files(): recursive listing of either mount          │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │  WriteExecutor (local)    │   │  WriteExecutor (corebank) │
//! │  • mkdir -p               │   │  • mkdir -p               │
//! │  • write + fsync          │   │  • write + fsync          │
//! └───────────────────────────┘   └───────────────────────────┘
//!               │                               │
//!     local blocking pool            corebank blocking pool
//!     (io_workers each, default 20)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dual_mount_sync::{DualMountConfig, DualWriteCoordinator, Metadata};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DualMountConfig {
//!         local_mount: "/mnt/efs-local".into(),
//!         corebank_mount: "/mnt/efs-corebank".into(),
//!         ..Default::default()
//!     };
//!     let coordinator = DualWriteCoordinator::new(config).expect("mounts unavailable");
//!
//!     let mut metadata = Metadata::new();
//!     metadata.insert("source".into(), json!("payments"));
//!     let result = coordinator.write_data("txn/0001.json", "{\"amount\": 10}", Some(&metadata)).await;
//!
//!     if !result.fully_replicated() {
//!         // Repair corebank once it is reachable again
//!         let report = coordinator.sync_missing_files().await;
//!         println!("synced {} files", report.synced_files);
//!     }
//! }
//! ```
//!
//! ## Semantics
//!
//! - **Partial success is normal**: a write is counted successful if either
//!   mount accepted it. Inspect [`DualWriteResult`] for per-mount detail.
//! - **Timeouts are distinct**: a destination that misses the deadline reports
//!   [`WriteError::Timeout`], not an I/O error.
//! - **Mounts are isolated**: each mount has its own blocking-I/O pool, so a
//!   hung corebank cannot starve local writes or probes.
//! - **No rollback**: an abandoned write may still land on disk later; the
//!   reconciliation sweep exists for that.
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`DualWriteCoordinator`] and its result types
//! - [`mount`]: mounts, per-mount I/O pools, the write executor, the health
//!   probe and the tree walker behind listings and reconciliation
//! - [`envelope`]: the metadata envelope format
//! - [`sink`]: the external metrics sink interface
//! - [`metrics`]: internal `metrics`-facade instrumentation
//! - [`config`]: configuration and environment loading

pub mod config;
pub mod envelope;
pub mod mount;
pub mod sink;
pub mod coordinator;
pub mod metrics;

pub use config::{ConfigError, DualMountConfig};
pub use coordinator::{
    BatchSummary, DualWriteCoordinator, DualWriteResult, FileListing, HealthReport, MetricsSnapshot,
    SyncReport, WriteMetrics, WriteRequest,
};
pub use envelope::{encode_payload, Metadata, WriteEnvelope};
pub use mount::probe::{HealthStatus, MountProbe, ProbeError, PROBE_FILE_PREFIX};
pub use mount::writer::{WriteError, WriteExecutor, WriteResult};
pub use mount::walk::{EntryType, FileEntry};
pub use mount::{IoPool, Mount, MountError, MountKind};
pub use sink::{FacadeSink, MetricSample, MetricsSink, NoopSink, SampleName, SinkError, Unit};
pub use crate::metrics::LatencyTimer;
