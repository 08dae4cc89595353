//! Alert engine.
//!
//! Scans the full reading history of every domain for values that breach
//! their [`ThresholdRule`](crate::domain::ThresholdRule) and produces one
//! [`Alert`] per breaching `(domain, metric)` pair. Alerts are ordered by
//! domain (air, water, biodiversity) and then by the registry's declaration
//! order, so identical input always yields identical output.
//!
//! The engine keeps no state between calls: every [`AlertEngine::evaluate`]
//! is a fresh full scan with no side effects. Counting and logging raised
//! alerts belongs to the evaluation cycle in [`crate::monitor`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Alert, BreachDirection, Domain};
use crate::registry::ThresholdRegistry;
use crate::store::ReadingStore;

/// Result of one alert evaluation.
///
/// `Clear` is an explicit "no alerts" answer. Callers that have not evaluated
/// yet hold no outcome at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "alerts", rename_all = "snake_case")]
pub enum AlertOutcome {
    Clear,
    Breaches(Vec<Alert>),
}

impl AlertOutcome {
    fn from_alerts(alerts: Vec<Alert>) -> Self {
        if alerts.is_empty() {
            AlertOutcome::Clear
        } else {
            AlertOutcome::Breaches(alerts)
        }
    }

    /// Alerts in evaluation order; empty when clear.
    pub fn alerts(&self) -> &[Alert] {
        match self {
            AlertOutcome::Clear => &[],
            AlertOutcome::Breaches(alerts) => alerts,
        }
    }

    pub fn into_alerts(self) -> Vec<Alert> {
        match self {
            AlertOutcome::Clear => Vec::new(),
            AlertOutcome::Breaches(alerts) => alerts,
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, AlertOutcome::Clear)
    }

    pub fn len(&self) -> usize {
        self.alerts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_clear()
    }
}

/// Offending readings gathered for one metric during a scan.
struct BreachAccumulator {
    count: usize,
    sites: BTreeSet<String>,
    trigger_at: DateTime<Utc>,
    trigger_site: String,
    trigger_excursion: f64,
    direction: BreachDirection,
}

impl BreachAccumulator {
    fn new(at: DateTime<Utc>, site: &str, excursion: f64, direction: BreachDirection) -> Self {
        Self {
            count: 0,
            sites: BTreeSet::new(),
            trigger_at: at,
            trigger_site: site.to_string(),
            trigger_excursion: excursion,
            direction,
        }
    }

    /// Track a breach. The trigger is the most recent offending reading;
    /// ties go to the larger excursion, then to the first site in key order.
    fn observe(&mut self, at: DateTime<Utc>, site: &str, excursion: f64, direction: BreachDirection) {
        self.count += 1;
        self.sites.insert(site.to_string());
        let newer = at > self.trigger_at;
        let worse = at == self.trigger_at && excursion > self.trigger_excursion;
        if newer || worse {
            self.trigger_at = at;
            self.trigger_site = site.to_string();
            self.trigger_excursion = excursion;
            self.direction = direction;
        }
    }
}

/// Stateless breach scanner over a [`ReadingStore`].
#[derive(Debug, Clone)]
pub struct AlertEngine {
    registry: Arc<ThresholdRegistry>,
}

impl AlertEngine {
    pub fn new(registry: Arc<ThresholdRegistry>) -> Self {
        Self { registry }
    }

    /// Scan every domain and return the deduplicated, ordered alerts.
    ///
    /// Pure: safe to call from read-only getters.
    pub fn evaluate(&self, store: &ReadingStore) -> AlertOutcome {
        let mut alerts = Vec::new();
        for domain in Domain::all() {
            self.scan_domain(store, domain, &mut alerts);
        }
        AlertOutcome::from_alerts(alerts)
    }

    fn scan_domain(&self, store: &ReadingStore, domain: Domain, out: &mut Vec<Alert>) {
        let mut breaches: HashMap<String, BreachAccumulator> = HashMap::new();

        for reading in store.readings(domain) {
            let Some(rule) = self.registry.rule_for(domain, &reading.metric) else {
                continue;
            };
            let Some(breach) = rule.check(reading.value) else {
                continue;
            };
            breaches
                .entry(reading.metric.clone())
                .or_insert_with(|| {
                    BreachAccumulator::new(
                        reading.timestamp,
                        &reading.site_id,
                        breach.excursion,
                        breach.direction,
                    )
                })
                .observe(
                    reading.timestamp,
                    &reading.site_id,
                    breach.excursion,
                    breach.direction,
                );
        }

        // Emit in registry declaration order.
        for rule in self.registry.rules(domain) {
            let Some(acc) = breaches.remove(&rule.metric) else {
                continue;
            };
            out.push(Alert {
                domain,
                severity: rule.severity,
                message: Alert::compose_message(
                    acc.direction,
                    &rule.metric,
                    &acc.trigger_site,
                    acc.sites.len(),
                ),
                triggering_metric: rule.metric.clone(),
                triggering_site: acc.trigger_site,
                timestamp: acc.trigger_at,
                direction: acc.direction,
                offending_readings: acc.count,
                sites: acc.sites.into_iter().collect(),
            });
        }
    }
}
