// ===============================
// src/main.rs
// ===============================
/*
 cargo run -- --input-dir input --output-dir output --stream-seed 7
 RUST_LOG=bond_desk=debug cargo run -- --book-fills --metrics-file output/metrics.prom
*/
/*
=============================================================================
Project : bond_desk - fixed-income desk data plane in Rust
Module  : main.rs
Version : 0.5.0
License : MIT (see LICENSE)

Summary : Replays trades, prices, market data and customer inquiries through
          synchronous pub/sub services (positions, PV01 risk, algo streaming,
          algo execution, inquiries) and writes an append-only audit log.
=============================================================================
*/
use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bond_desk::{config, desk, metrics, recorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---- Load config & desk params ----
    let (args, params) = config::load().context("invalid desk parameters")?;

    // ---- Logging ----
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Metrics ----
    metrics::init();

    info!(
        input = %args.input_dir.display(),
        output = %args.output_dir.display(),
        record_file = ?args.record_file,
        stream_seed = ?args.stream_seed,
        book_fills = args.book_fills,
        pv01_per_unit = %params.pv01_per_unit,
        "startup config"
    );

    // ---- Recorder ----
    let (audit_tx, audit_rx) = mpsc::unbounded_channel();
    let recorder = tokio::spawn(recorder::run(audit_rx, args.output_dir.clone(), args.record_file.clone()));

    // ---- Desk ----
    let wiring = desk::Wiring { stream_seed: args.stream_seed, book_fills: args.book_fills };
    let desk = desk::Desk::new(params, wiring, Some(audit_tx)).context("building desk")?;

    // ---- Replay: prices, market data, trades, inquiries ----
    for (feed, report) in desk.replay(&args.input_dir).await {
        info!(feed, read = report.read, accepted = report.accepted, skipped = report.skipped, "ingested");
    }

    // ---- Bucketed risk ----
    let buckets = desk.report_bucket_risk();
    info!(buckets = buckets.len(), "bucket risk reported");

    // ---- Shutdown: every audit sender lives in the desk ----
    drop(desk);
    let recorded = recorder
        .await
        .context("recorder task panicked")?
        .context("recorder failed")?;
    info!(recorded, "audit log closed");

    if let Some(path) = &args.metrics_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(path, metrics::encode_metrics())
            .await
            .with_context(|| format!("writing metrics to {}", path.display()))?;
        info!(path = %path.display(), "metrics snapshot written");
    }
    Ok(())
}
