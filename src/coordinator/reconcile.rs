// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reconciliation sweep: copy files that exist locally but not on corebank.
//!
//! Only absence is repaired. A corebank file that exists but differs from
//! the local copy is left alone. Files are copied byte-for-byte (envelopes
//! are not re-wrapped), one at a time, so a recovering corebank mount is not
//! flooded.

use std::time::Instant;
use tracing::{error, info, warn};

use crate::metrics::LatencyTimer;
use crate::mount::walk::walk_tree;
use crate::mount::{run_blocking, MountError, MountKind};
use super::{DualWriteCoordinator, SyncReport};

impl DualWriteCoordinator {
    /// Copy every local file missing from corebank.
    ///
    /// Per-file failures are collected and do not stop the sweep;
    /// `success` is true only when nothing failed. Running it again with no
    /// local changes copies nothing.
    pub async fn sync_missing_files(&self) -> SyncReport {
        let _timer = LatencyTimer::new("corebank", "reconcile");
        let start = Instant::now();

        let (local_files, mut errors) = match self.local_files().await {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, "Sync failed: cannot list local mount");
                return SyncReport {
                    success: false,
                    duration: start.elapsed(),
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let mut files_synced = Vec::new();
        for relative in &local_files {
            match self.copy_if_missing(relative).await {
                Ok(true) => files_synced.push(relative.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(file = %relative, error = %e, "Failed to sync file to corebank");
                    crate::metrics::record_reconcile_error();
                    errors.push(format!("{relative}: {e}"));
                }
            }
        }

        let duration = start.elapsed();
        info!(
            synced = files_synced.len(),
            total = local_files.len(),
            errors = errors.len(),
            duration_ms = duration.as_millis() as u64,
            "Sync completed"
        );

        SyncReport {
            success: errors.is_empty(),
            duration,
            synced_files: files_synced.len(),
            total_files: local_files.len(),
            files_synced,
            errors,
            error: None,
        }
    }

    /// Regular local files as `/`-separated relative paths, probe files
    /// excluded, plus the entries the walk could not read. An unreadable
    /// root is an error.
    async fn local_files(&self) -> Result<(Vec<String>, Vec<String>), MountError> {
        let root = self.local.root().to_path_buf();
        let walk = run_blocking(self.io.permits(MountKind::Local), move || walk_tree(&root)).await?;
        let files = walk
            .entries
            .into_iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.name)
            .collect();
        Ok((files, walk.errors))
    }

    /// Returns `true` when the file was copied, `false` when corebank had it.
    async fn copy_if_missing(&self, relative: &str) -> Result<bool, MountError> {
        let target = self.corebank.resolve(relative)?;
        let exists = tokio::fs::try_exists(&target)
            .await
            .map_err(|e| MountError::io(&target, e))?;
        if exists {
            return Ok(false);
        }

        let source = self.local.resolve(relative)?;
        let bytes = tokio::fs::read(&source)
            .await
            .map_err(|e| MountError::io(&source, e))?;
        let written = self.executor.persist(&self.corebank, relative, bytes.into()).await?;
        crate::metrics::record_reconciled_file(written);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copies_missing_files_verbatim() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        let local = dir.path().join("local");
        fs::create_dir_all(local.join("a/b")).unwrap();
        fs::write(local.join("top.txt"), b"top").unwrap();
        fs::write(local.join("a/b/deep.json"), b"{\"content\": \"x\"}").unwrap();

        let report = coordinator.sync_missing_files().await;

        assert!(report.success);
        assert_eq!(report.total_files, 2);
        assert_eq!(report.synced_files, 2);
        assert_eq!(report.files_synced, vec!["a/b/deep.json", "top.txt"]);
        assert_eq!(
            fs::read(dir.path().join("corebank/a/b/deep.json")).unwrap(),
            b"{\"content\": \"x\"}"
        );
    }

    #[tokio::test]
    async fn test_existing_corebank_files_untouched() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        fs::write(dir.path().join("local/same.txt"), b"local version").unwrap();
        fs::write(dir.path().join("corebank/same.txt"), b"stale version").unwrap();

        let report = coordinator.sync_missing_files().await;

        assert!(report.success);
        assert_eq!(report.total_files, 1);
        assert_eq!(report.synced_files, 0);
        assert_eq!(
            coordinator.read_data("same.txt", MountKind::Corebank).await.unwrap(),
            "stale version"
        );
    }

    #[tokio::test]
    async fn test_probe_files_skipped() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        fs::write(dir.path().join("local/health_check_local_123_abc.tmp"), b"probe").unwrap();
        fs::write(dir.path().join("local/real.txt"), b"data").unwrap();

        let report = coordinator.sync_missing_files().await;

        assert_eq!(report.total_files, 1);
        assert_eq!(report.files_synced, vec!["real.txt"]);
        assert!(!dir.path().join("corebank/health_check_local_123_abc.tmp").exists());
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        fs::write(dir.path().join("local/one.txt"), b"1").unwrap();

        let first = coordinator.sync_missing_files().await;
        let second = coordinator.sync_missing_files().await;

        assert_eq!(first.synced_files, 1);
        assert!(second.success);
        assert_eq!(second.synced_files, 0);
        assert_eq!(second.total_files, 1);
    }

    #[tokio::test]
    async fn test_broken_corebank_collects_errors() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        fs::write(dir.path().join("local/one.txt"), b"1").unwrap();
        fs::write(dir.path().join("local/two.txt"), b"2").unwrap();
        break_corebank(&dir);

        let report = coordinator.sync_missing_files().await;

        assert!(!report.success);
        assert_eq!(report.synced_files, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("one.txt: "));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_local_root_aborts() {
        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        fs::remove_dir_all(dir.path().join("local")).unwrap();

        let report = coordinator.sync_missing_files().await;

        assert!(!report.success);
        assert_eq!(report.total_files, 0);
        assert!(report.error.is_some());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_name_reported_not_mangled() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let coordinator = coordinator_in(&dir);
        let local = dir.path().join("local");
        fs::write(local.join(OsStr::from_bytes(b"bad\xff.txt")), b"x").unwrap();
        fs::write(local.join("good.txt"), b"g").unwrap();

        let report = coordinator.sync_missing_files().await;

        assert!(!report.success);
        assert_eq!(report.files_synced, vec!["good.txt"]);
        assert_eq!(report.total_files, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("not valid UTF-8"));
        assert_eq!(fs::read_dir(dir.path().join("corebank")).unwrap().count(), 1);
    }
}
