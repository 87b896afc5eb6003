//! Recursive directory listings on either mount.

use std::io::ErrorKind;
use std::time::Instant;
use tracing::{info, warn};

use crate::mount::walk::walk_tree;
use crate::mount::{run_blocking, MountError, MountKind};
use super::{DualWriteCoordinator, FileListing};

impl DualWriteCoordinator {
    /// List every file and directory below `path` on one mount.
    ///
    /// `path` is relative to the mount root; an empty path lists the root.
    /// Entry names are relative to `path`. Probe files are never listed.
    /// Unreadable entries go to `errors` without failing the listing. The
    /// walk runs under the shared deadline.
    pub async fn list_files(&self, kind: MountKind, path: &str) -> FileListing {
        let start = Instant::now();
        let mount = self.mount(kind);
        let target = if path.is_empty() {
            Ok(mount.root().to_path_buf())
        } else {
            mount.resolve(path)
        };
        let target = match target {
            Ok(target) => target,
            Err(e) => return FileListing::failed(kind, path, start.elapsed(), e.to_string()),
        };

        let walked = self
            .within_deadline(run_blocking(self.io.permits(kind), move || walk_tree(&target)))
            .await;
        let duration = start.elapsed();

        match walked {
            Some(Ok(walk)) => {
                info!(
                    mount = kind.as_str(),
                    path,
                    total = walk.entries.len(),
                    errors = walk.errors.len(),
                    duration_ms = duration.as_millis() as u64,
                    "Listed files"
                );
                FileListing {
                    success: true,
                    duration,
                    mount: kind,
                    path: path.to_string(),
                    total: walk.entries.len(),
                    files: walk.entries,
                    errors: walk.errors,
                    error: None,
                }
            }
            Some(Err(MountError::Io { ref source, .. })) if source.kind() == ErrorKind::NotFound => {
                FileListing::failed(kind, path, duration, format!("Path not found: {path}"))
            }
            Some(Err(e)) => {
                warn!(mount = kind.as_str(), path, error = %e, "List files failed");
                FileListing::failed(kind, path, duration, e.to_string())
            }
            None => {
                let secs = self.config.sync_timeout_secs;
                warn!(mount = kind.as_str(), path, timeout_secs = secs, "List files timed out");
                crate::metrics::record_timeout("list");
                FileListing::failed(kind, path, duration, format!("List timeout after {secs}s"))
            }
        }
    }
}
