//! Environmental Monitoring CLI
//!
//! The `envmon` command loads threshold and compliance configuration,
//! ingests newline-delimited JSON readings and reports on them.
//!
//! ## Commands
//!
//! - `check-config`: Validate configuration files and list the rules
//! - `evaluate`: Run one evaluation cycle and print the report
//! - `status`: Station statuses for one domain
//! - `summary`: Mean of the latest reading per site for one metric
//! - `series`: Timestamp-ordered values of one metric
//! - `compliance`: Compliance records with their status bands

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use envmon_core::{
    ComplianceRecord, Domain, EvaluationReport, HeadlineMetric, IngestSummary, Monitor,
    MonitorConfig, SeriesPoint, StationStatus, ThresholdRegistry, METRICS,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "envmon")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Environmental monitoring: thresholds, compliance and alerts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Threshold rules file (TOML)
    #[arg(long, global = true, env = "ENVMON_THRESHOLDS")]
    thresholds: Option<PathBuf>,

    /// Compliance rates file (TOML)
    #[arg(long, global = true, env = "ENVMON_COMPLIANCE")]
    compliance: Option<PathBuf>,

    /// Readings to ingest (JSONL); `-` reads stdin
    #[arg(short, long, global = true)]
    readings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and list threshold rules
    CheckConfig,

    /// Run one evaluation cycle over the ingested readings
    Evaluate {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show station statuses for a domain
    Status {
        /// Domain: air, water or biodiversity
        #[arg(short, long)]
        domain: Domain,
    },

    /// Average of the latest reading per site for a metric
    Summary {
        #[arg(short, long)]
        domain: Domain,

        #[arg(short, long)]
        metric: String,
    },

    /// Timestamp-ordered values of a metric
    Series {
        #[arg(short, long)]
        domain: Domain,

        #[arg(short, long)]
        metric: String,

        /// Restrict to one site
        #[arg(short, long)]
        site: Option<String>,
    },

    /// Show compliance records
    Compliance,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MonitorConfig::from_env();
    if let Some(path) = &cli.thresholds {
        config = config.with_thresholds(path);
    }
    if let Some(path) = &cli.compliance {
        config = config.with_compliance(Some(path.clone()));
    }

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    envmon_core::init_tracing(config.log_format.or_json(cli.json_logs), level);

    let result = match cli.command {
        Commands::CheckConfig => cmd_check_config(&config),
        Commands::Evaluate { json } => {
            let mut monitor = load_monitor(&config, cli.readings.as_deref())?;
            cmd_evaluate(&mut monitor, json)
        }
        Commands::Status { domain } => {
            let monitor = load_monitor(&config, cli.readings.as_deref())?;
            cmd_status(&monitor, domain)
        }
        Commands::Summary { domain, metric } => {
            let monitor = load_monitor(&config, cli.readings.as_deref())?;
            cmd_summary(&monitor, domain, &metric)
        }
        Commands::Series {
            domain,
            metric,
            site,
        } => {
            let monitor = load_monitor(&config, cli.readings.as_deref())?;
            cmd_series(&monitor, domain, &metric, site.as_deref())
        }
        Commands::Compliance => {
            let monitor = load_monitor(&config, None)?;
            cmd_compliance(&monitor)
        }
    };

    METRICS.flush();
    result
}

/// Build the monitor from configuration and ingest `readings` if given.
fn load_monitor(config: &MonitorConfig, readings: Option<&Path>) -> Result<Monitor> {
    let mut monitor = config.build_monitor().with_context(|| {
        format!(
            "Failed to load configuration from {:?}",
            config.thresholds_path
        )
    })?;

    if let Some(path) = readings {
        let summary = ingest_path(&mut monitor, path)?;
        info!(
            accepted = summary.accepted,
            overwritten = summary.overwritten,
            rejected = summary.rejected,
            "readings ingested"
        );
    }
    Ok(monitor)
}

fn ingest_path(monitor: &mut Monitor, path: &Path) -> Result<IngestSummary> {
    if path == Path::new("-") {
        return monitor
            .ingest_jsonl(io::stdin().lock())
            .context("Failed to read readings from stdin");
    }
    let file = File::open(path).with_context(|| format!("Failed to open readings: {:?}", path))?;
    monitor
        .ingest_jsonl(BufReader::new(file))
        .with_context(|| format!("Failed to read readings: {:?}", path))
}

fn cmd_check_config(config: &MonitorConfig) -> Result<()> {
    let registry = config
        .load_registry()
        .with_context(|| format!("Invalid thresholds in {:?}", config.thresholds_path))?;
    let compliance = config
        .load_compliance()
        .context("Invalid compliance configuration")?;

    println!("{}", render_rules_text(&registry));
    println!(
        "{} rules, {} compliance parameters: OK",
        registry.len(),
        compliance.len()
    );
    Ok(())
}

fn cmd_evaluate(monitor: &mut Monitor, json: bool) -> Result<()> {
    let report = monitor.evaluate();
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", render_report_text(report));
    }
    Ok(())
}

fn cmd_status(monitor: &Monitor, domain: Domain) -> Result<()> {
    let statuses = monitor.get_station_statuses(domain);
    println!("{}", render_statuses_text(domain, &statuses));
    Ok(())
}

fn cmd_summary(monitor: &Monitor, domain: Domain, metric: &str) -> Result<()> {
    match monitor.get_summary(domain, metric) {
        Some(avg) => println!("{domain} {metric}: {avg:.2}"),
        None => println!("{domain} {metric}: no data"),
    }
    Ok(())
}

fn cmd_series(monitor: &Monitor, domain: Domain, metric: &str, site: Option<&str>) -> Result<()> {
    let points = monitor.store().series(domain, metric, site);
    if points.is_empty() {
        println!("No readings for {domain} {metric}");
        return Ok(());
    }
    println!("{}", render_series_text(&points));
    Ok(())
}

fn cmd_compliance(monitor: &Monitor) -> Result<()> {
    let records = monitor.get_compliance_records();
    if records.is_empty() {
        println!("No compliance parameters configured.");
        return Ok(());
    }
    println!("{}", render_compliance_text(&records));
    Ok(())
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn render_rules_text(registry: &ThresholdRegistry) -> String {
    let mut lines = Vec::new();
    for domain in Domain::all() {
        for rule in registry.rules(domain) {
            lines.push(format!(
                "{:<13} {:<18} {:<22} {}",
                domain,
                rule.metric,
                rule.describe_range(),
                rule.severity
            ));
        }
    }
    lines.join("\n")
}

fn render_statuses_text(domain: Domain, statuses: &BTreeMap<String, StationStatus>) -> String {
    if statuses.is_empty() {
        return format!("No {domain} stations reporting.");
    }
    statuses
        .iter()
        .map(|(site, status)| format!("{site:<24} {status}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_series_text(points: &[SeriesPoint]) -> String {
    points
        .iter()
        .map(|p| {
            format!(
                "{}  {:<24} {}",
                p.timestamp.format("%Y-%m-%d %H:%M"),
                p.site_id,
                p.value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_compliance_text(records: &[ComplianceRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{:<28} {:>6.1}%  {}", r.parameter, r.rate, r.status))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_headline_metric(m: &HeadlineMetric) -> String {
    let value = match m.value {
        Some(v) => match &m.unit {
            Some(unit) => format!("{v:.2} {unit}"),
            None => format!("{v:.2}"),
        },
        None => "-".to_string(),
    };
    format!("{} {}: {} ({})", m.domain, m.metric, value, m.status)
}

fn render_report_text(report: &EvaluationReport) -> String {
    let mut out = Vec::new();
    let h = &report.headline;

    out.push(format!(
        "Cycle {} at {} ({} readings)",
        report.cycle_id,
        report.evaluated_at.format("%Y-%m-%d %H:%M:%S"),
        report.readings
    ));
    out.push(render_headline_metric(&h.air));
    out.push(render_headline_metric(&h.water));
    out.push(match h.biodiversity_index {
        Some(v) => format!("biodiversity index: {v}"),
        None => "biodiversity index: -".to_string(),
    });
    out.push(match h.overall_compliance {
        Some(v) => format!("overall compliance: {v:.1}%"),
        None => "overall compliance: -".to_string(),
    });
    out.push(format!(
        "monitored sites: {}, active alerts: {}",
        h.monitored_sites, h.active_alerts
    ));

    for (domain, statuses) in &report.station_statuses {
        if statuses.is_empty() {
            continue;
        }
        out.push(String::new());
        out.push(format!("[{domain}]"));
        out.push(render_statuses_text(*domain, statuses));
    }

    out.push(String::new());
    if report.alerts.is_clear() {
        out.push("No alerts.".to_string());
    } else {
        out.push("Alerts:".to_string());
        for alert in report.alerts.alerts() {
            out.push(format!("  [{}] {}", alert.severity, alert.message));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmon_core::{ComplianceTable, Reading, Severity, ThresholdRule};
    use std::io::Write;
    use std::sync::Arc;

    fn registry() -> ThresholdRegistry {
        ThresholdRegistry::from_rules(vec![
            ThresholdRule::upper(Domain::Air, "PM2.5", 35.0, Severity::Critical).with_unit("µg/m³"),
            ThresholdRule::range(Domain::Water, "pH", 6.5, 8.5, Severity::Critical),
        ])
        .unwrap()
    }

    fn reading(site: &str, domain: Domain, metric: &str, value: f64) -> Reading {
        let at = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        Reading::new(at, site, domain, metric, value)
    }

    #[test]
    fn test_render_rules_lists_every_rule() {
        let text = render_rules_text(&registry());
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("PM2.5"));
        assert!(text.contains("critical"));
    }

    #[test]
    fn test_render_statuses_empty_domain() {
        let text = render_statuses_text(Domain::Water, &BTreeMap::new());
        assert_eq!(text, "No water stations reporting.");
    }

    #[test]
    fn test_render_report_lists_alerts() {
        let mut monitor = Monitor::new(Arc::new(registry()));
        monitor
            .record(reading("Industrial Area", Domain::Air, "PM2.5", 48.0))
            .unwrap();
        monitor
            .record(reading("Lake Central", Domain::Water, "pH", 7.0))
            .unwrap();

        let text = render_report_text(monitor.evaluate());
        assert!(text.contains("HIGH PM2.5 levels detected in Industrial Area"));
        assert!(text
            .lines()
            .any(|l| l.starts_with("Industrial Area") && l.ends_with("POOR")));
        assert!(text.contains("active alerts: 1"));
    }

    #[test]
    fn test_render_report_clear() {
        let mut monitor = Monitor::new(Arc::new(registry()));
        let text = render_report_text(monitor.evaluate());
        assert!(text.contains("No alerts."));
        assert!(text.contains("air PM2.5: - (No data)"));
    }

    #[test]
    fn test_render_compliance_shows_band() {
        let mut table = ComplianceTable::new();
        table.set_rate("Noise Pollution", 95.0).unwrap();
        let text = render_compliance_text(&table.records());
        assert!(text.contains("Noise Pollution"));
        assert!(text.contains("95.0%"));
        assert!(text.contains("Compliant"));
    }

    #[test]
    fn test_ingest_path_reads_jsonl_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"timestamp":"2024-01-01T00:00:00Z","site_id":"North Zone","domain":"air","metric":"PM2.5","value":22.5}}"#
        )
        .unwrap();
        writeln!(file, "garbage").unwrap();

        let mut monitor = Monitor::new(Arc::new(registry()));
        let summary = ingest_path(&mut monitor, file.path()).unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(monitor.get_summary(Domain::Air, "PM2.5"), Some(22.5));
    }

    #[test]
    fn test_ingest_path_missing_file_errors() {
        let mut monitor = Monitor::new(Arc::new(registry()));
        let err = ingest_path(&mut monitor, Path::new("/nonexistent/readings.jsonl")).unwrap_err();
        assert!(err.to_string().contains("Failed to open readings"));
    }

    #[test]
    fn test_cli_parses_domain_argument() {
        let cli = Cli::try_parse_from(["envmon", "status", "--domain", "water"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                domain: Domain::Water
            }
        ));
        assert!(Cli::try_parse_from(["envmon", "status", "--domain", "soil"]).is_err());
    }
}
