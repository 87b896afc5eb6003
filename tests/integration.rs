//! Integration Tests for Dual Mount Sync
//!
//! End-to-end scenarios against real directories created with `tempfile`.
//! No external services are needed.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//!
//! # Run only happy-path tests
//! cargo test --test integration happy
//! ```
//!
//! # Test Organization
//! - `happy_*` - Normal operation: replication, envelopes, batching, health
//! - `recovery_*` - Reconciliation after a corebank outage
//! - `listing_*` - Directory listings on either mount

use serde_json::{json, Value};
use tempfile::TempDir;

use dual_mount_sync::{
    DualMountConfig, DualWriteCoordinator, EntryType, Metadata, MountKind, NoopSink,
    WriteEnvelope, WriteRequest,
};
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

fn test_config(dir: &TempDir) -> DualMountConfig {
    DualMountConfig {
        local_mount: dir.path().join("efs-local"),
        corebank_mount: dir.path().join("efs-corebank"),
        sync_timeout_secs: 30,
        ..Default::default()
    }
}

fn coordinator(config: DualMountConfig) -> DualWriteCoordinator {
    DualWriteCoordinator::new(config)
        .expect("Failed to create coordinator")
        .with_sink(Arc::new(NoopSink))
}

fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        other => panic!("metadata must be an object, got {other}"),
    }
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[tokio::test]
async fn happy_envelope_scenario_on_both_mounts() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));
    let meta = metadata(json!({"k": 1}));

    let result = coordinator.write_data("a/b.json", "hello", Some(&meta)).await;
    assert!(result.fully_replicated(), "write failed: {:?}", result);

    for kind in [MountKind::Local, MountKind::Corebank] {
        let raw = coordinator.read_data("a/b.json", kind).await.expect("read failed");
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["content"], json!("hello"));
        assert_eq!(parsed["metadata"], json!({"k": 1}));
        assert_eq!(result.get(kind).bytes_written, raw.len());
    }
}

#[tokio::test]
async fn happy_both_mounts_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));
    let meta = metadata(json!({"account": "12-345", "seq": 7}));

    coordinator.write_data("ledger/2026/10/txn.json", "{\"amount\": 100}", Some(&meta)).await;
    coordinator.write_data("ledger/raw.csv", "id,amount\n1,100\n", None).await;

    for file in ["ledger/2026/10/txn.json", "ledger/raw.csv"] {
        let local = std::fs::read(dir.path().join("efs-local").join(file)).unwrap();
        let corebank = std::fs::read(dir.path().join("efs-corebank").join(file)).unwrap();
        assert_eq!(local, corebank, "mounts diverged for {file}");
    }
}

#[tokio::test]
async fn happy_no_metadata_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));
    let content = "{\"looks\": \"like json\"} but is not an envelope";

    coordinator.write_data("plain.txt", content, None).await;
    coordinator.write_data("plain-empty-meta.txt", content, Some(&Metadata::new())).await;

    for file in ["plain.txt", "plain-empty-meta.txt"] {
        for kind in [MountKind::Local, MountKind::Corebank] {
            assert_eq!(coordinator.read_data(file, kind).await.unwrap(), content);
        }
    }
}

#[tokio::test]
async fn happy_envelope_parses_back() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));
    let meta = metadata(json!({"nested": {"list": [1, 2, 3]}, "flag": true}));

    coordinator.write_data("env.json", "line one\nline \"two\"", Some(&meta)).await;

    let raw = std::fs::read(dir.path().join("efs-corebank/env.json")).unwrap();
    let envelope = WriteEnvelope::parse(&raw).unwrap();
    assert_eq!(envelope.metadata, meta);
    assert_eq!(envelope.content, "line one\nline \"two\"");
}

#[tokio::test]
async fn happy_batch_of_250_uses_three_batches() {
    let dir = tempfile::tempdir().unwrap();
    let config = DualMountConfig { batch_size: 100, ..test_config(&dir) };
    let coordinator = coordinator(config);

    let files: Vec<WriteRequest> = (0..250)
        .map(|i| WriteRequest::new(format!("bulk/{i:03}.txt"), format!("record {i}")))
        .collect();
    let summary = coordinator.batch_write(files).await;

    assert_eq!(summary.total_files, 250);
    assert_eq!(summary.batches_processed, 3);
    assert_eq!(summary.successful_writes, 250);
    assert_eq!(summary.failed_writes, 0);
    assert!(summary.throughput > 0.0);

    let metrics = coordinator.metrics();
    assert_eq!(metrics.total_writes, 250);
    assert_eq!(metrics.successful_writes, 250);
    assert_eq!(
        coordinator.read_data("bulk/249.txt", MountKind::Corebank).await.unwrap(),
        "record 249"
    );
}

#[tokio::test]
async fn happy_health_check_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));

    coordinator.write_data("warmup.txt", "x", None).await;
    let report = coordinator.health_check().await;

    assert!(report.healthy);
    assert!(report.local.writable && report.local.readable);
    assert!(report.corebank.writable && report.corebank.readable);
    assert_eq!(report.metrics.total_writes, 1);
    assert!(report.metrics.last_health_check.is_some());

    // Probe files are cleaned up
    let leftovers = std::fs::read_dir(dir.path().join("efs-local"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("health_check_"))
        .count();
    assert_eq!(leftovers, 0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["local"]["healthy"], json!(true));
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn happy_concurrent_writes_same_file_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));

    let a = coordinator.clone();
    let b = coordinator.clone();
    let (ra, rb) = tokio::join!(
        a.write_data("race.txt", "version-a", None),
        b.write_data("race.txt", "version-b", None),
    );
    assert!(ra.any_succeeded() && rb.any_succeeded());

    let local = coordinator.read_data("race.txt", MountKind::Local).await.unwrap();
    assert!(local == "version-a" || local == "version-b");
    assert_eq!(coordinator.metrics().total_writes, 2);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[tokio::test]
async fn recovery_reconcile_after_disabled_period() {
    let dir = tempfile::tempdir().unwrap();

    // Phase 1: corebank writes off
    {
        let config = DualMountConfig { dual_write_enabled: false, ..test_config(&dir) };
        let coordinator = coordinator(config);
        let meta = metadata(json!({"phase": 1}));
        for i in 0..5 {
            let result = coordinator
                .write_data(&format!("outage/{i}.json"), &format!("payload {i}"), Some(&meta))
                .await;
            assert!(result.local.success);
            assert!(result.corebank.error.as_ref().unwrap().is_disabled());
        }
    }

    // Phase 2: back to dual write, repair corebank
    let coordinator = coordinator(test_config(&dir));
    coordinator.write_data("after/ok.txt", "both", None).await;

    let report = coordinator.sync_missing_files().await;
    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.total_files, 6);
    assert_eq!(report.synced_files, 5);

    for i in 0..5 {
        let file = format!("outage/{i}.json");
        let local = std::fs::read(dir.path().join("efs-local").join(&file)).unwrap();
        let corebank = std::fs::read(dir.path().join("efs-corebank").join(&file)).unwrap();
        assert_eq!(local, corebank, "envelope must be copied verbatim");
    }

    // Idempotent
    let again = coordinator.sync_missing_files().await;
    assert!(again.success);
    assert_eq!(again.synced_files, 0);
}

// =============================================================================
// Listing Tests
// =============================================================================

#[tokio::test]
async fn listing_shows_degraded_gap_until_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));
    coordinator.write_data("ledger/a.json", "{}", Some(&metadata(json!({"n": 1})))).await;

    let corebank = dir.path().join("efs-corebank");
    std::fs::remove_file(corebank.join("ledger/a.json")).unwrap();
    coordinator.health_check().await;

    let before = coordinator.list_files(MountKind::Corebank, "ledger").await;
    assert!(before.success);
    assert_eq!(before.total, 0);

    coordinator.sync_missing_files().await;

    let local = coordinator.list_files(MountKind::Local, "ledger").await;
    let after = coordinator.list_files(MountKind::Corebank, "ledger").await;
    assert_eq!(after.total, 1);
    let entry = &after.files[0];
    assert_eq!(entry.name, "a.json");
    assert_eq!(entry.entry_type, EntryType::File);
    assert_eq!(entry.size, local.files[0].size);
    assert!(entry.modified.is_some());

    let json = serde_json::to_value(&after).unwrap();
    assert_eq!(json["files"][0]["entry_type"], json!("file"));
    assert_eq!(json["mount"], json!("corebank"));
}

#[tokio::test]
async fn listing_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(test_config(&dir));

    let listing = coordinator.list_files(MountKind::Corebank, "does/not/exist").await;

    assert!(!listing.success);
    assert_eq!(listing.error.as_deref(), Some("Path not found: does/not/exist"));
}
