//! Aggregate health check across both mounts.

use chrono::Utc;
use tracing::{debug, warn};

use crate::mount::probe::HealthStatus;
use crate::mount::Mount;
use crate::sink::{self, MetricSample, SampleName};
use super::{DualWriteCoordinator, HealthReport};

impl DualWriteCoordinator {
    /// Probe both mounts concurrently.
    ///
    /// The report is healthy when local is healthy and, if dual write is
    /// enabled, corebank is healthy too. With dual write off, corebank is
    /// still probed and reported but does not affect the aggregate.
    ///
    /// Each probe runs under the shared deadline; a mount that does not
    /// answer in time is reported unwritable with a timeout error.
    pub async fn health_check(&self) -> HealthReport {
        let (local, corebank) = tokio::join!(
            self.probe_within_deadline(&self.local),
            self.probe_within_deadline(&self.corebank),
        );

        let dual_write_enabled = self.config.dual_write_enabled;
        let healthy = local.healthy && (corebank.healthy || !dual_write_enabled);

        let timestamp = Utc::now();
        self.metrics.record_health_check(timestamp);

        if healthy {
            debug!(
                local_ms = local.latency_ms,
                corebank_ms = corebank.latency_ms,
                "Health check passed"
            );
        } else {
            warn!(
                local = local.healthy,
                corebank = corebank.healthy,
                dual_write_enabled,
                "Health check degraded"
            );
        }

        sink::emit(
            self.sink.as_ref(),
            &[
                MetricSample::flag(SampleName::LocalEfsHealth, local.healthy),
                MetricSample::flag(SampleName::CoreBankEfsHealth, corebank.healthy),
                MetricSample::new(SampleName::LocalEfsLatency, local.latency_ms),
                MetricSample::new(SampleName::CoreBankEfsLatency, corebank.latency_ms),
            ],
        );

        HealthReport {
            timestamp,
            healthy,
            dual_write_enabled,
            local,
            corebank,
            metrics: self.metrics.snapshot(),
        }
    }

    async fn probe_within_deadline(&self, mount: &Mount) -> HealthStatus {
        match self.within_deadline(self.probe.probe(mount)).await {
            Some(status) => status,
            None => {
                let secs = self.config.sync_timeout_secs;
                warn!(mount = mount.name(), timeout_secs = secs, "Health check abandoned");
                crate::metrics::record_timeout("probe");
                HealthStatus::timed_out(mount, secs)
            }
        }
    }
}
