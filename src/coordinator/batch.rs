//! Batched dual writes.
//!
//! Requests are split into chunks of `batch_size`. Chunks run one after
//! another; the items of a chunk run concurrently under one shared deadline.
//! A chunk that misses its deadline is counted as entirely failed, even if
//! some of its writes landed.

use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{join_error_text, BatchSummary, DualWriteCoordinator, DualWriteResult, WriteRequest};

pub(super) const BATCH_TIMEOUT_ERROR: &str = "Batch timeout exceeded";
pub(super) const BOTH_FAILED_ERROR: &str = "Both local and corebank writes failed";

#[derive(Debug, Default)]
struct ChunkOutcome {
    successful: usize,
    failed: usize,
    errors: Vec<String>,
}

impl ChunkOutcome {
    fn tally(&mut self, joined: Result<DualWriteResult, tokio::task::JoinError>) {
        match joined {
            Ok(result) if result.any_succeeded() => self.successful += 1,
            Ok(_) => {
                self.failed += 1;
                self.errors.push(BOTH_FAILED_ERROR.to_string());
            }
            Err(e) => {
                self.failed += 1;
                self.errors.push(join_error_text(e));
            }
        }
    }
}

impl DualWriteCoordinator {
    /// Write many records in fixed-size chunks.
    ///
    /// An item is successful when either destination accepted it.
    pub async fn batch_write(&self, files: Vec<WriteRequest>) -> BatchSummary {
        let start = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let mut summary = BatchSummary {
            total_files: files.len(),
            ..Default::default()
        };

        let mut items = files.into_iter();
        loop {
            let chunk: Vec<WriteRequest> = items.by_ref().take(batch_size).collect();
            if chunk.is_empty() {
                break;
            }

            let size = chunk.len();
            let outcome = self.process_chunk(chunk).await;
            crate::metrics::record_batch(size, outcome.successful);
            debug!(
                batch = summary.batches_processed,
                size,
                successful = outcome.successful,
                failed = outcome.failed,
                "Batch chunk processed"
            );

            summary.successful_writes += outcome.successful;
            summary.failed_writes += outcome.failed;
            summary.batches_processed += 1;
            summary.errors.extend(outcome.errors);
        }

        summary.total_duration = start.elapsed();
        let secs = summary.total_duration.as_secs_f64();
        summary.throughput = if secs > 0.0 {
            summary.total_files as f64 / secs
        } else {
            0.0
        };

        info!(
            total = summary.total_files,
            successful = summary.successful_writes,
            failed = summary.failed_writes,
            batches = summary.batches_processed,
            throughput = summary.throughput,
            "Batch write completed"
        );

        summary
    }

    async fn process_chunk(&self, chunk: Vec<WriteRequest>) -> ChunkOutcome {
        let size = chunk.len();
        let mut join_set: JoinSet<DualWriteResult> = JoinSet::new();

        for request in chunk {
            let coordinator = self.clone();
            join_set.spawn(async move {
                coordinator
                    .write_data(&request.filename, &request.content, request.metadata.as_ref())
                    .await
            });
        }

        let collected = self
            .within_deadline(async {
                let mut outcome = ChunkOutcome::default();
                while let Some(joined) = join_set.join_next().await {
                    outcome.tally(joined);
                }
                outcome
            })
            .await;

        match collected {
            Some(outcome) => outcome,
            None => {
                join_set.abort_all();
                warn!(size, timeout_secs = self.config.sync_timeout_secs, "Batch chunk timed out");
                crate::metrics::record_timeout("batch");
                ChunkOutcome {
                    successful: 0,
                    failed: size,
                    errors: vec![BATCH_TIMEOUT_ERROR.to_string()],
                }
            }
        }
    }
}
