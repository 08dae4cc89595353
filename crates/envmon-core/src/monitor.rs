//! Evaluation cycle and the interface consumed by presentation layers.
//!
//! A [`Monitor`] owns the process-scoped [`ReadingStore`], the read-only
//! [`ThresholdRegistry`] and the externally supplied [`ComplianceTable`].
//! Nothing is recomputed implicitly: callers record readings and then run
//! [`Monitor::evaluate`], which classifies, aggregates and alerts over one
//! consistent view of the store and returns an [`EvaluationReport`].

use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::{self, ComplianceTable, HeadlineSummary};
use crate::alerts::{AlertEngine, AlertOutcome};
use crate::classifier::{self, StationStatus};
use crate::domain::{Alert, ComplianceRecord, Domain, Reading, Result};
use crate::ingest::{self, IngestSummary};
use crate::metrics::METRICS;
use crate::obs::{self, CycleSpan};
use crate::registry::{self, ThresholdRegistry};
use crate::store::{ReadingStore, RecordOutcome};

/// Everything one evaluation cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub cycle_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    /// Readings in the evaluated view.
    pub readings: usize,
    pub station_statuses: BTreeMap<Domain, BTreeMap<String, StationStatus>>,
    /// Metrics seen in the latest readings that have no threshold rule.
    pub unclassified_metrics: BTreeMap<Domain, Vec<String>>,
    pub compliance: Vec<ComplianceRecord>,
    pub headline: HeadlineSummary,
    pub alerts: AlertOutcome,
}

impl EvaluationReport {
    /// Stations classified `Poor` across all domains.
    pub fn poor_stations(&self) -> usize {
        self.station_statuses
            .values()
            .flat_map(|sites| sites.values())
            .filter(|s| **s == StationStatus::Poor)
            .count()
    }
}

/// Process-scoped monitoring state with an explicit evaluation cycle.
#[derive(Debug)]
pub struct Monitor {
    registry: Arc<ThresholdRegistry>,
    engine: AlertEngine,
    store: ReadingStore,
    compliance: ComplianceTable,
    last_report: Option<EvaluationReport>,
}

impl Monitor {
    pub fn new(registry: Arc<ThresholdRegistry>) -> Self {
        Self {
            engine: AlertEngine::new(Arc::clone(&registry)),
            registry,
            store: ReadingStore::new(),
            compliance: ComplianceTable::new(),
            last_report: None,
        }
    }

    pub fn with_compliance(mut self, compliance: ComplianceTable) -> Self {
        self.compliance = compliance;
        self
    }

    pub fn registry(&self) -> &ThresholdRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    // -- ingestion ----------------------------------------------------------

    /// Record one reading. Invalid readings are rejected and nothing is stored.
    pub fn record(&mut self, reading: Reading) -> Result<RecordOutcome> {
        reading.validate()?;
        Ok(self.store.record(reading))
    }

    /// Record a batch, skipping invalid readings.
    pub fn record_all(&mut self, readings: impl IntoIterator<Item = Reading>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for (idx, reading) in readings.into_iter().enumerate() {
            match self.record(reading) {
                Ok(outcome) => {
                    summary.accepted += 1;
                    if matches!(outcome, RecordOutcome::Overwritten { .. }) {
                        summary.overwritten += 1;
                    }
                }
                Err(e) => {
                    summary.rejected += 1;
                    obs::emit_record_rejected(idx + 1, &e);
                }
            }
        }
        summary
    }

    /// Parse newline-delimited JSON readings and record the valid ones.
    pub fn ingest_jsonl<R: BufRead>(&mut self, reader: R) -> Result<IngestSummary> {
        let (readings, parsed) = ingest::parse_jsonl(reader)?;
        let recorded = self.record_all(readings);
        Ok(IngestSummary {
            accepted: recorded.accepted,
            overwritten: recorded.overwritten,
            rejected: parsed.rejected + recorded.rejected,
        })
    }

    /// Insert or replace an externally supplied compliance rate.
    pub fn set_compliance_rate(&mut self, parameter: &str, rate: f64) -> Result<()> {
        self.compliance.set_rate(parameter, rate)
    }

    /// Drop every reading and the last report. Registry and compliance
    /// configuration are kept.
    pub fn clear(&mut self) {
        self.store.clear();
        self.last_report = None;
    }

    // -- evaluation ---------------------------------------------------------

    /// Run one evaluation cycle over the owned store and keep its report.
    pub fn evaluate(&mut self) -> &EvaluationReport {
        let report = self.evaluate_store(&self.store);
        self.last_report.insert(report)
    }

    /// Run one evaluation cycle over an external snapshot.
    ///
    /// Used when readings arrive through a
    /// [`SharedReadingStore`](crate::store::SharedReadingStore); the owned
    /// store and the last report are left untouched.
    pub fn evaluate_store(&self, store: &ReadingStore) -> EvaluationReport {
        let started = Instant::now();
        let cycle_id = Uuid::new_v4();
        let cycle = cycle_id.to_string();
        let _span = CycleSpan::enter(&cycle);
        obs::emit_cycle_started(&cycle, store.len());
        if store.is_empty() {
            obs::emit_empty_store(&cycle);
        }

        let mut station_statuses = BTreeMap::new();
        let mut unclassified_metrics = BTreeMap::new();
        for domain in Domain::all() {
            station_statuses.insert(
                domain,
                classifier::station_statuses(&self.registry, store, domain),
            );

            let latest = store.latest_per_pair(domain);
            let missing = registry::unclassified_metrics(
                &self.registry,
                domain,
                latest.iter().map(|r| r.metric.as_str()),
            );
            for metric in &missing {
                obs::emit_unclassified_metric(domain, metric);
            }
            if !missing.is_empty() {
                unclassified_metrics.insert(domain, missing);
            }
        }

        let alerts = self.engine.evaluate(store);
        for alert in alerts.alerts() {
            METRICS.inc_alerts_raised();
            obs::emit_alert_raised(alert);
        }
        let headline = aggregator::headline(&self.registry, store, &self.compliance, &alerts);

        let report = EvaluationReport {
            cycle_id,
            evaluated_at: Utc::now(),
            readings: store.len(),
            station_statuses,
            unclassified_metrics,
            compliance: self.compliance.records(),
            headline,
            alerts,
        };

        METRICS.inc_cycles();
        obs::emit_cycle_finished(
            &cycle,
            started.elapsed().as_millis() as u64,
            report.alerts.len(),
            report.poor_stations(),
        );
        report
    }

    /// Alerts of the last cycle. `None` until [`Monitor::evaluate`] has run.
    pub fn alerts(&self) -> Option<&AlertOutcome> {
        self.last_report.as_ref().map(|r| &r.alerts)
    }

    pub fn last_report(&self) -> Option<&EvaluationReport> {
        self.last_report.as_ref()
    }

    // -- presentation interface ---------------------------------------------

    /// Mean of the latest reading per site for `metric`.
    pub fn get_summary(&self, domain: Domain, metric: &str) -> Option<f64> {
        aggregator::point_summary(&self.store, domain, metric)
    }

    /// Compliance records in configured order, banded from current rates.
    pub fn get_compliance_records(&self) -> Vec<ComplianceRecord> {
        self.compliance.records()
    }

    /// Fresh full-store alert scan; empty when nothing breaches.
    ///
    /// Read-only: does not count or log alerts. Only evaluation cycles do.
    pub fn get_alerts(&self) -> Vec<Alert> {
        self.engine.evaluate(&self.store).into_alerts()
    }

    pub fn get_station_statuses(&self, domain: Domain) -> BTreeMap<String, StationStatus> {
        classifier::station_statuses(&self.registry, &self.store, domain)
    }

    pub fn get_headline(&self) -> HeadlineSummary {
        let alerts = self.engine.evaluate(&self.store);
        aggregator::headline(&self.registry, &self.store, &self.compliance, &alerts)
    }
}
