//! Environmental Monitoring Core Library
//!
//! Ingests air, water and biodiversity readings, classifies them against
//! configured regulatory thresholds, scores compliance parameters and raises
//! deduplicated alerts. Re-exports the core components for programmatic use.

pub mod aggregator;
pub mod alerts;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod metrics;
pub mod monitor;
pub mod obs;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use domain::{
    Alert, Breach, BreachDirection, ComplianceParameter, ComplianceRecord, ComplianceStatus,
    ConfigError, Domain, MonitorError, Reading, ReadingKey, Result, SeriesPoint, Severity,
    ThresholdRule,
};

pub use aggregator::{
    headline, point_summary, total_at_latest, ComplianceTable, HeadlineMetric, HeadlineStatus,
    HeadlineSummary,
};
pub use alerts::{AlertEngine, AlertOutcome};
pub use classifier::{classify, classify_value, metric_statuses, station_statuses, StationStatus};
pub use config::MonitorConfig;
pub use ingest::{parse_jsonl, parse_line, IngestSummary};
pub use monitor::{EvaluationReport, Monitor};
pub use registry::{HeadlineMetrics, ThresholdRegistry};
pub use store::{ReadingStore, RecordOutcome, SharedReadingStore};

pub use metrics::{MetricsSnapshot, METRICS};
pub use obs::{
    emit_alert_raised, emit_config_loaded, emit_cycle_finished, emit_cycle_started,
    emit_empty_store, emit_reading_rejected, emit_record_rejected, emit_unclassified_metric,
    CycleSpan,
};
pub use telemetry::{init_tracing, LogFormat};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
