// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic dual-mount usage example.
//!
//! Demonstrates:
//! 1. Configuring two mounts (environment, falling back to temp dirs)
//! 2. A metadata-wrapped write and a raw write
//! 3. Reading both copies back
//! 4. A batch of 25 files
//! 5. A health check
//! 6. Recovering corebank with a reconciliation sweep
//! 7. Displaying metrics (OTEL-compatible)
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//!
//! # Against real mounts
//! LOCAL_EFS_PATH=/mnt/efs-local COREBANK_EFS_PATH=/mnt/efs-corebank cargo run --example basic_usage
//! ```

use dual_mount_sync::{DualMountConfig, DualWriteCoordinator, Metadata, MountKind, WriteRequest};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for OTEL export)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           dual-mount-sync: Basic Usage Example                ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure the coordinator
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Configuring mounts...");

    let scratch = tempfile::tempdir()?;
    let mut config = DualMountConfig::from_env()?;
    if std::env::var_os("LOCAL_EFS_PATH").is_none() {
        config.local_mount = scratch.path().join("efs-local");
        config.corebank_mount = scratch.path().join("efs-corebank");
    }
    config.batch_size = 10;

    let coordinator = DualWriteCoordinator::new(config)?;
    println!("   └─ Local:    {}", coordinator.mount(MountKind::Local).root().display());
    println!("   └─ Corebank: {}", coordinator.mount(MountKind::Corebank).root().display());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Write with and without metadata
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Writing records...");

    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!("payments"));
    metadata.insert("account".into(), json!("12-345"));

    let wrapped = coordinator
        .write_data("txn/0001.json", r#"{"amount": 125.50}"#, Some(&metadata))
        .await;
    println!(
        "   └─ txn/0001.json → local={} corebank={} ({} bytes)",
        wrapped.local.success, wrapped.corebank.success, wrapped.local.bytes_written
    );

    let raw = coordinator.write_data("audit/boot.log", "service started\n", None).await;
    println!(
        "   └─ audit/boot.log → local={} corebank={} ({:?})",
        raw.local.success, raw.corebank.success, raw.local.duration
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Read both copies back
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📖 Reading txn/0001.json back...");
    for kind in [MountKind::Local, MountKind::Corebank] {
        match coordinator.read_data("txn/0001.json", kind).await {
            Ok(data) => println!("   └─ {kind}: {} bytes", data.len()),
            Err(e) => println!("   └─ {kind}: ❌ {e}"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Batch write
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📚 Batch writing 25 files (batch_size=10)...");
    let files: Vec<WriteRequest> = (0..25)
        .map(|i| {
            WriteRequest::new(format!("batch/{i:02}.json"), json!({"seq": i}).to_string())
                .with_metadata(metadata.clone())
        })
        .collect();
    let summary = coordinator.batch_write(files).await;
    println!(
        "   └─ {}/{} ok in {} batches, {:.1} files/s",
        summary.successful_writes, summary.total_files, summary.batches_processed, summary.throughput
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Health check
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🩺 Health check...");
    let report = coordinator.health_check().await;
    println!("   └─ Overall: {}", if report.healthy { "✅ healthy" } else { "⚠️  unhealthy" });
    println!("   └─ Local:    {:.2}ms", report.local.latency_ms);
    println!("   └─ Corebank: {:.2}ms", report.corebank.latency_ms);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Reconcile after losing a corebank copy
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔁 Simulating a lost corebank file and reconciling...");
    let lost = coordinator.mount(MountKind::Corebank).resolve("batch/07.json")?;
    std::fs::remove_file(&lost)?;
    let sync = coordinator.sync_missing_files().await;
    println!(
        "   └─ Synced {}/{} files in {:?}: {:?}",
        sync.synced_files, sync.total_files, sync.duration, sync.files_synced
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 7. List what corebank holds
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📂 Listing corebank txn/...");
    let listing = coordinator.list_files(MountKind::Corebank, "txn").await;
    for entry in &listing.files {
        println!("   └─ {} ({:?}, {} bytes)", entry.name, entry.entry_type, entry.size);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 8. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    let snapshot = coordinator.metrics();
    println!("\n📊 Coordinator Metrics:");
    println!("   └─ Writes: {} total, {} ok, {} failed", snapshot.total_writes, snapshot.successful_writes, snapshot.failed_writes);
    println!("   └─ Avg write time: {:.4}s", snapshot.avg_write_time);

    println!("\n📈 Raw Metrics (OTEL export format):");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics in OTEL-compatible format
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters = Vec::new();
    let mut gauges = Vec::new();
    let mut histograms = Vec::new();

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let name = format!("{}{}", key.name(), label_str);

        match value {
            DebugValue::Counter(v) => counters.push((name, v)),
            DebugValue::Gauge(v) => gauges.push((name, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                let avg = if count > 0 { sum / count as f64 } else { 0.0 };
                histograms.push((name, count, avg));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, value) in &counters {
            println!("   │  └─ {} = {}", name, value);
        }
    }
    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, value) in &gauges {
            println!("   │  └─ {} = {:.2}", name, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, count, avg) in &histograms {
            println!("   │  └─ {} count={} avg={:.6}", name, count, avg);
        }
    }
    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
