//! envmond - streaming evaluation daemon
//!
//! Reads newline-delimited JSON readings from stdin into a shared store and
//! runs an evaluation cycle over a snapshot of that store on every tick.
//! A final cycle runs when input ends. Ctrl-C stops the daemon immediately.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use envmon_core::{
    emit_reading_rejected, parse_line, EvaluationReport, IngestSummary, Monitor, MonitorConfig,
    RecordOutcome, SharedReadingStore, METRICS,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "envmond")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Streaming environmental evaluation daemon", long_about = None)]
struct Args {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Threshold rules file (TOML)
    #[arg(long, env = "ENVMON_THRESHOLDS")]
    thresholds: Option<PathBuf>,

    /// Compliance rates file (TOML)
    #[arg(long, env = "ENVMON_COMPLIANCE")]
    compliance: Option<PathBuf>,

    /// Seconds between evaluation cycles
    #[arg(
        short,
        long,
        default_value = "60",
        env = "ENVMON_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MonitorConfig::from_env();
    if let Some(path) = &args.thresholds {
        config = config.with_thresholds(path);
    }
    if let Some(path) = &args.compliance {
        config = config.with_compliance(Some(path.clone()));
    }

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    envmon_core::init_tracing(config.log_format.or_json(args.json_logs), level);

    let monitor = config.build_monitor().with_context(|| {
        format!(
            "Failed to load configuration from {:?}",
            config.thresholds_path
        )
    })?;
    let shared = SharedReadingStore::new();

    info!(
        version = envmon_core::VERSION,
        rules = monitor.registry().len(),
        interval_secs = args.interval,
        "envmond started"
    );

    let ingest = {
        let shared = shared.clone();
        tokio::spawn(async move {
            ingest_lines(BufReader::new(tokio::io::stdin()), &shared).await
        })
    };

    run(
        &monitor,
        &shared,
        Duration::from_secs(args.interval),
        ingest,
        tokio::signal::ctrl_c(),
    )
    .await?;

    METRICS.flush();
    info!("envmond stopped");
    Ok(())
}

/// Drive evaluation cycles until ingestion finishes or `shutdown` resolves.
async fn run<S>(
    monitor: &Monitor,
    shared: &SharedReadingStore,
    period: Duration,
    mut ingest: tokio::task::JoinHandle<std::io::Result<IngestSummary>>,
    shutdown: S,
) -> Result<Option<EvaluationReport>>
where
    S: std::future::Future<Output = std::io::Result<()>>,
{
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; skip it so the first cycle
    // sees a full period of input.
    ticker.tick().await;
    tokio::pin!(shutdown);

    let mut last = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                last = Some(run_cycle(monitor, shared));
            }
            joined = &mut ingest => {
                let summary = joined
                    .context("ingest task panicked")?
                    .context("Failed to read stdin")?;
                info!(
                    accepted = summary.accepted,
                    overwritten = summary.overwritten,
                    rejected = summary.rejected,
                    "input closed"
                );
                return Ok(Some(run_cycle(monitor, shared)));
            }
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for shutdown signal");
                }
                info!("shutdown requested");
                ingest.abort();
                return Ok(last);
            }
        }
    }
}

/// Evaluate one consistent snapshot of the shared store.
fn run_cycle(monitor: &Monitor, shared: &SharedReadingStore) -> EvaluationReport {
    let report = monitor.evaluate_store(&shared.snapshot());
    if !report.alerts.is_clear() {
        warn!(
            cycle_id = %report.cycle_id,
            alerts = report.alerts.len(),
            active = report.headline.active_alerts,
            "alerts active"
        );
    }
    report
}

/// Record every valid line of `reader` into `shared`.
async fn ingest_lines<R>(reader: R, shared: &SharedReadingStore) -> std::io::Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_line(trimmed) {
            Ok(reading) => {
                summary.accepted += 1;
                if let RecordOutcome::Overwritten { .. } = shared.record(reading) {
                    summary.overwritten += 1;
                }
            }
            Err(e) => {
                summary.rejected += 1;
                emit_reading_rejected(line_no, &e);
            }
        }
    }
    Ok(summary)
}
