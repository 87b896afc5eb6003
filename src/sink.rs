// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fire-and-forget metrics sink.
//!
//! The coordinator reports a small fixed vocabulary of samples (mount health,
//! latency, write success) to an injected [`MetricsSink`]. The sink decides
//! where they go; the coordinator only logs a failed `record` and carries on.
//!
//! # Example
//!
//! ```
//! use dual_mount_sync::{MetricSample, MetricsSink, SampleName, SinkError};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<MetricSample>>);
//!
//! impl MetricsSink for Collect {
//!     fn record(&self, sample: &MetricSample) -> Result<(), SinkError> {
//!         self.0.lock().unwrap().push(*sample);
//!         Ok(())
//!     }
//! }
//!
//! let sink = Collect::default();
//! sink.record(&MetricSample::new(SampleName::DualWriteLatency, 12.5)).unwrap();
//! assert_eq!(sink.0.lock().unwrap().len(), 1);
//! ```

use metrics::gauge;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("metrics sink unavailable: {0}")]
    Unavailable(String),
    #[error("metrics sink rejected sample: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Count,
    Milliseconds,
    Percent,
}

impl Unit {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::Milliseconds => "Milliseconds",
            Self::Percent => "Percent",
        }
    }
}

/// The fixed sample vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleName {
    LocalEfsHealth,
    CoreBankEfsHealth,
    LocalEfsLatency,
    CoreBankEfsLatency,
    DualWriteLatency,
    DualWriteSuccessRate,
    LocalWriteSuccess,
    CoreBankWriteSuccess,
}

impl SampleName {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalEfsHealth => "LocalEFSHealth",
            Self::CoreBankEfsHealth => "CoreBankEFSHealth",
            Self::LocalEfsLatency => "LocalEFSLatency",
            Self::CoreBankEfsLatency => "CoreBankEFSLatency",
            Self::DualWriteLatency => "DualWriteLatency",
            Self::DualWriteSuccessRate => "DualWriteSuccessRate",
            Self::LocalWriteSuccess => "LocalWriteSuccess",
            Self::CoreBankWriteSuccess => "CoreBankWriteSuccess",
        }
    }

    #[must_use]
    pub fn unit(&self) -> Unit {
        match self {
            Self::LocalEfsHealth
            | Self::CoreBankEfsHealth
            | Self::LocalWriteSuccess
            | Self::CoreBankWriteSuccess => Unit::Count,
            Self::LocalEfsLatency | Self::CoreBankEfsLatency | Self::DualWriteLatency => {
                Unit::Milliseconds
            }
            Self::DualWriteSuccessRate => Unit::Percent,
        }
    }

    /// Collector namespace: health samples vs. write performance samples.
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::LocalEfsHealth
            | Self::CoreBankEfsHealth
            | Self::LocalEfsLatency
            | Self::CoreBankEfsLatency => "Banking/EFS",
            _ => "Banking/Performance",
        }
    }
}

impl std::fmt::Display for SampleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub name: SampleName,
    pub value: f64,
}

impl MetricSample {
    #[must_use]
    pub fn new(name: SampleName, value: f64) -> Self {
        Self { name, value }
    }

    #[must_use]
    pub fn flag(name: SampleName, on: bool) -> Self {
        Self::new(name, if on { 1.0 } else { 0.0 })
    }

    #[must_use]
    pub fn unit(&self) -> Unit {
        self.name.unit()
    }
}

/// Capability to accept one named numeric sample.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: &MetricSample) -> Result<(), SinkError>;
}

/// Forwards samples to the `metrics` facade as gauges.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl MetricsSink for FacadeSink {
    fn record(&self, sample: &MetricSample) -> Result<(), SinkError> {
        gauge!(
            "dual_mount_sample",
            "name" => sample.name.as_str(),
            "namespace" => sample.name.namespace(),
            "unit" => sample.unit().as_str()
        )
        .set(sample.value);
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _sample: &MetricSample) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Send samples to the sink, logging and swallowing any failure.
pub(crate) fn emit(sink: &dyn MetricsSink, samples: &[MetricSample]) {
    for sample in samples {
        if let Err(e) = sink.record(sample) {
            warn!(sample = %sample.name, error = %e, "Failed to send metric sample");
            crate::metrics::record_sink_failure(sample.name.as_str());
        }
    }
}
