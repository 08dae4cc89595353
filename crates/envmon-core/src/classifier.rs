//! Per-reading and per-station classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, Reading};
use crate::registry::ThresholdRegistry;
use crate::store::ReadingStore;

/// Classification of a reading or a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Good,
    Poor,
    /// No threshold rule covers the metric.
    Unclassified,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Good => f.write_str("GOOD"),
            StationStatus::Poor => f.write_str("POOR"),
            StationStatus::Unclassified => f.write_str("UNCLASSIFIED"),
        }
    }
}

/// Classify one reading against the registry.
pub fn classify(registry: &ThresholdRegistry, reading: &Reading) -> StationStatus {
    classify_value(registry, reading.domain, &reading.metric, reading.value)
}

/// Classify a bare value as if it were a reading of `metric`.
pub fn classify_value(
    registry: &ThresholdRegistry,
    domain: Domain,
    metric: &str,
    value: f64,
) -> StationStatus {
    match registry.rule_for(domain, metric) {
        None => StationStatus::Unclassified,
        Some(rule) if rule.check(value).is_some() => StationStatus::Poor,
        Some(_) => StationStatus::Good,
    }
}

/// Status of every `(site, metric)` pair, using only the latest reading of
/// each pair.
pub fn metric_statuses(
    registry: &ThresholdRegistry,
    store: &ReadingStore,
    domain: Domain,
) -> BTreeMap<String, BTreeMap<String, StationStatus>> {
    let mut out: BTreeMap<String, BTreeMap<String, StationStatus>> = BTreeMap::new();
    for reading in store.latest_per_pair(domain) {
        let status = classify(registry, &reading);
        out.entry(reading.site_id)
            .or_default()
            .insert(reading.metric, status);
    }
    out
}

/// Status of every site in a domain.
///
/// A site is `Poor` if any of its metrics is poor, `Good` if at least one is
/// good and none is poor, and `Unclassified` otherwise.
pub fn station_statuses(
    registry: &ThresholdRegistry,
    store: &ReadingStore,
    domain: Domain,
) -> BTreeMap<String, StationStatus> {
    metric_statuses(registry, store, domain)
        .into_iter()
        .map(|(site, metrics)| (site, fold_statuses(metrics.values().copied())))
        .collect()
}

fn fold_statuses(statuses: impl Iterator<Item = StationStatus>) -> StationStatus {
    let mut folded = StationStatus::Unclassified;
    for status in statuses {
        match status {
            StationStatus::Poor => return StationStatus::Poor,
            StationStatus::Good => folded = StationStatus::Good,
            StationStatus::Unclassified => {}
        }
    }
    folded
}
