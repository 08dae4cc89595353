//! Structured observability hooks for the evaluation lifecycle.
//!
//! This module provides:
//! - Cycle-scoped tracing spans via the `CycleSpan` RAII guard
//! - Emission functions for key events: config load, cycle start/finish,
//!   raised alerts, unclassified metrics, rejected input
//!
//! Events are emitted at `info!` level unless noted. For JSON output, set
//! `ENVMON_LOG_FORMAT=json` or pass `--json-logs` to the binaries.

use tracing::{debug, info, warn};

use crate::domain::{Alert, Domain};

/// RAII guard that enters a cycle-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = CycleSpan::enter("5d0c...");
/// // every event until drop carries cycle_id = "5d0c..."
/// ```
pub struct CycleSpan {
    _span: tracing::span::EnteredSpan,
}

impl CycleSpan {
    pub fn enter(cycle_id: &str) -> Self {
        let span = tracing::info_span!("envmon.cycle", cycle_id = %cycle_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a configuration file was loaded.
pub fn emit_config_loaded(path: &str, entries: usize) {
    info!(event = "config.loaded", path = %path, entries = entries);
}

/// Emit event: evaluation cycle started over `readings` readings.
pub fn emit_cycle_started(cycle_id: &str, readings: usize) {
    info!(event = "cycle.started", cycle_id = %cycle_id, readings = readings);
}

/// Emit event: evaluation cycle finished.
pub fn emit_cycle_finished(cycle_id: &str, duration_ms: u64, alerts: usize, poor_stations: usize) {
    info!(
        event = "cycle.finished",
        cycle_id = %cycle_id,
        duration_ms = duration_ms,
        alerts = alerts,
        poor_stations = poor_stations,
    );
}

/// Emit event: evaluation requested on an empty store (warn level).
pub fn emit_empty_store(cycle_id: &str) {
    warn!(event = "cycle.empty_store", cycle_id = %cycle_id, "no readings recorded yet");
}

/// Emit event: one alert raised (warn level).
pub fn emit_alert_raised(alert: &Alert) {
    warn!(
        event = "alert.raised",
        domain = %alert.domain,
        severity = %alert.severity,
        metric = %alert.triggering_metric,
        site = %alert.triggering_site,
        offending = alert.offending_readings,
        "{}",
        alert.message
    );
}

/// Emit event: readings of a metric with no threshold rule (debug level).
pub fn emit_unclassified_metric(domain: Domain, metric: &str) {
    debug!(event = "reading.unclassified", domain = %domain, metric = %metric);
}

/// Emit event: an input record was rejected (warn level).
pub fn emit_reading_rejected(line: usize, error: &dyn std::fmt::Display) {
    warn!(event = "reading.rejected", line = line, error = %error);
}

/// Emit event: a reading in an in-memory batch was rejected (warn level).
/// `index` is the 1-based position within the batch.
pub fn emit_record_rejected(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "reading.rejected", index = index, error = %error);
}
