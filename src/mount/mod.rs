// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage mounts and the blocking I/O primitives shared by every component.
//!
//! A [`Mount`] is a root directory plus a logical name (`local` or
//! `corebank`). All filesystem syscalls that can block (directory creation,
//! write + `fsync`, probe round trips, tree walks) go through
//! [`run_blocking`], which bounds them to that mount's share of the
//! [`IoPool`].

pub mod probe;
pub mod walk;
pub mod writer;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum MountError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Data integrity check failed for {}", path.display())]
    Integrity { path: PathBuf },
    #[error("Invalid filename {0:?}: must be a relative path inside the mount")]
    InvalidFilename(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Envelope encoding failed: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("I/O worker failed: {0}")]
    TaskFailed(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl MountError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Which of the two fixed destinations a mount is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Local,
    Corebank,
}

impl MountKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Corebank => "corebank",
        }
    }
}

impl std::fmt::Display for MountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage destination: a root directory and its logical name.
///
/// Mounts are immutable once built; the coordinator clones them into the
/// per-destination write tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    kind: MountKind,
    root: PathBuf,
}

impl Mount {
    pub fn new(kind: MountKind, root: impl Into<PathBuf>) -> Self {
        Self { kind, root: root.into() }
    }

    #[must_use]
    pub fn kind(&self) -> MountKind {
        self.kind
    }

    /// Logical name used for metric labels and probe file names.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a caller-supplied filename to a path under this mount.
    ///
    /// Only plain relative paths are accepted: absolute paths and `..`
    /// components could address files outside the mount root.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, MountError> {
        let relative = Path::new(filename);
        let mut has_name = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_name = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(MountError::InvalidFilename(filename.to_string()));
                }
            }
        }
        if !has_name {
            return Err(MountError::InvalidFilename(filename.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Create the mount root if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), MountError> {
        fs::create_dir_all(&self.root).map_err(|e| MountError::io(&self.root, e))
    }
}

/// Blocking-I/O permits, one independent pool per mount.
///
/// A destination whose syscalls hang can exhaust only its own pool; the
/// other mount keeps its workers.
#[derive(Debug)]
pub struct IoPool {
    local: Arc<Semaphore>,
    corebank: Arc<Semaphore>,
}

impl IoPool {
    /// `workers` permits for each mount.
    pub fn new(workers: usize) -> Self {
        Self {
            local: Arc::new(Semaphore::new(workers)),
            corebank: Arc::new(Semaphore::new(workers)),
        }
    }

    #[must_use]
    pub fn permits(&self, kind: MountKind) -> &Arc<Semaphore> {
        match kind {
            MountKind::Local => &self.local,
            MountKind::Corebank => &self.corebank,
        }
    }
}

/// Run a blocking filesystem job on the bounded worker pool.
///
/// The permit travels into the blocking closure, so it is only released once
/// the syscalls finish, even if the awaiting task was cancelled first.
pub(crate) async fn run_blocking<T, F>(permits: &Arc<Semaphore>, job: F) -> Result<T, MountError>
where
    F: FnOnce() -> Result<T, MountError> + Send + 'static,
    T: Send + 'static,
{
    let permit = Arc::clone(permits)
        .acquire_owned()
        .await
        .map_err(|e| MountError::TaskFailed(e.to_string()))?;

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job()
    })
    .await
    .map_err(|e| MountError::TaskFailed(e.to_string()))?
}

/// Create every missing parent directory of `path`. Safe to race.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), MountError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| MountError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Single buffered write followed by flush and `fsync`.
///
/// Returns only after the bytes are on stable storage.
pub(crate) fn write_durable(path: &Path, payload: &[u8], buffer_size: usize) -> Result<usize, MountError> {
    let file = File::create(path).map_err(|e| MountError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(buffer_size, file);
    writer.write_all(payload).map_err(|e| MountError::io(path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| MountError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| MountError::io(path, e))?;
    Ok(payload.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mount_kind_display() {
        assert_eq!(MountKind::Local.to_string(), "local");
        assert_eq!(MountKind::Corebank.to_string(), "corebank");
    }

    #[test]
    fn test_resolve_nested_relative_path() {
        let mount = Mount::new(MountKind::Local, "/mnt/efs-local");
        let path = mount.resolve("a/b.json").unwrap();
        assert_eq!(path, PathBuf::from("/mnt/efs-local/a/b.json"));

        let path = mount.resolve("./c.txt").unwrap();
        assert_eq!(path, PathBuf::from("/mnt/efs-local/./c.txt"));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let mount = Mount::new(MountKind::Corebank, "/mnt/efs-corebank");
        assert!(matches!(mount.resolve("../etc/passwd"), Err(MountError::InvalidFilename(_))));
        assert!(matches!(mount.resolve("a/../../b"), Err(MountError::InvalidFilename(_))));
        assert!(matches!(mount.resolve("/etc/passwd"), Err(MountError::InvalidFilename(_))));
        assert!(matches!(mount.resolve(""), Err(MountError::InvalidFilename(_))));
        assert!(matches!(mount.resolve("."), Err(MountError::InvalidFilename(_))));
    }

    #[test]
    fn test_write_durable_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/file.txt");

        ensure_parent(&path).unwrap();
        let written = write_durable(&path, b"durable", 8).unwrap();

        assert_eq!(written, 7);
        assert_eq!(fs::read(&path).unwrap(), b"durable");
    }

    #[test]
    fn test_ensure_parent_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x/y/z.txt");
        ensure_parent(&path).unwrap();
        ensure_parent(&path).unwrap();
        assert!(dir.path().join("x/y").is_dir());
    }

    #[test]
    fn test_write_durable_missing_parent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing/file.txt");
        let err = write_durable(&path, b"data", 16).unwrap_err();
        assert!(matches!(err, MountError::Io { .. }));
    }

    #[tokio::test]
    async fn test_run_blocking_returns_job_result() {
        let permits = Arc::new(Semaphore::new(1));
        let value = run_blocking(&permits, || Ok::<_, MountError>(7)).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_io_pool_mounts_are_independent() {
        let pool = IoPool::new(1);
        let _held = Arc::clone(pool.permits(MountKind::Corebank)).acquire_owned().await.unwrap();

        assert_eq!(pool.permits(MountKind::Corebank).available_permits(), 0);
        let value = run_blocking(pool.permits(MountKind::Local), || Ok::<_, MountError>(1))
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_run_blocking_captures_panic() {
        let permits = Arc::new(Semaphore::new(1));
        let result: Result<(), MountError> = run_blocking(&permits, || panic!("disk on fire")).await;
        assert!(matches!(result, Err(MountError::TaskFailed(_))));
    }
}
