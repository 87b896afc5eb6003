//! Configuration for the dual-mount coordinator.
//!
//! # Example
//!
//! ```
//! use dual_mount_sync::DualMountConfig;
//!
//! // Minimal config (uses defaults)
//! let config = DualMountConfig::default();
//! assert_eq!(config.batch_size, 100);
//! assert!(config.dual_write_enabled);
//!
//! // Full config
//! let config = DualMountConfig {
//!     local_mount: "/tmp/efs-local".into(),
//!     corebank_mount: "/tmp/efs-corebank".into(),
//!     sync_timeout_secs: 5,
//!     batch_size: 50,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_LOCAL_MOUNT: &str = "LOCAL_EFS_PATH";
pub const ENV_COREBANK_MOUNT: &str = "COREBANK_EFS_PATH";
pub const ENV_DUAL_WRITE_ENABLED: &str = "DUAL_WRITE_ENABLED";
pub const ENV_SYNC_TIMEOUT: &str = "DUAL_WRITE_TIMEOUT";
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub const ENV_BUFFER_SIZE: &str = "BUFFER_SIZE";
pub const ENV_IO_WORKERS: &str = "IO_WORKERS";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Configuration for the dual-mount coordinator.
///
/// Mount roots are fixed for the lifetime of a coordinator. All other fields
/// have defaults matching a typical EFS deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct DualMountConfig {
    /// Root of the local (same-account) mount
    #[serde(default = "default_local_mount")]
    pub local_mount: PathBuf,

    /// Root of the cross-account corebank mount
    #[serde(default = "default_corebank_mount")]
    pub corebank_mount: PathBuf,

    /// When false, only the local mount is written
    #[serde(default = "default_dual_write_enabled")]
    pub dual_write_enabled: bool,

    /// Shared deadline for one dual write, and for one batch chunk
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,

    /// Items per batch chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Write buffer capacity in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Width of the blocking I/O worker pool
    #[serde(default = "default_io_workers")]
    pub io_workers: usize,
}

fn default_local_mount() -> PathBuf { PathBuf::from("/mnt/efs-local") }
fn default_corebank_mount() -> PathBuf { PathBuf::from("/mnt/efs-corebank") }
fn default_dual_write_enabled() -> bool { true }
fn default_sync_timeout_secs() -> u64 { 60 }
fn default_batch_size() -> usize { 100 }
fn default_buffer_size() -> usize { 1024 * 1024 } // 1 MB
fn default_io_workers() -> usize { 20 }

impl Default for DualMountConfig {
    fn default() -> Self {
        Self {
            local_mount: default_local_mount(),
            corebank_mount: default_corebank_mount(),
            dual_write_enabled: default_dual_write_enabled(),
            sync_timeout_secs: default_sync_timeout_secs(),
            batch_size: default_batch_size(),
            buffer_size: default_buffer_size(),
            io_workers: default_io_workers(),
        }
    }
}

impl DualMountConfig {
    /// Build a config from the process environment.
    ///
    /// Unset variables fall back to defaults. Numeric variables that fail to
    /// parse are an error rather than a silent default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_LOCAL_MOUNT) {
            config.local_mount = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_COREBANK_MOUNT) {
            config.corebank_mount = PathBuf::from(path);
        }
        if let Some(flag) = lookup(ENV_DUAL_WRITE_ENABLED) {
            config.dual_write_enabled = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup(ENV_SYNC_TIMEOUT) {
            config.sync_timeout_secs = parse_var(ENV_SYNC_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            config.batch_size = parse_var(ENV_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_BUFFER_SIZE) {
            config.buffer_size = parse_var(ENV_BUFFER_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_IO_WORKERS) {
            config.io_workers = parse_var(ENV_IO_WORKERS, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the coordinator cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Zero("buffer_size"));
        }
        if self.io_workers == 0 {
            return Err(ConfigError::Zero("io_workers"));
        }
        Ok(())
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
