//! In-memory reading store.
//!
//! Readings are kept per [`Domain`] in a map keyed by [`ReadingKey`], which
//! orders by timestamp first. Full history is retained for the lifetime of
//! the store; only [`ReadingStore::clear`] removes readings.
//!
//! [`SharedReadingStore`] wraps a store for concurrent ingestion. Evaluation
//! never reads it directly: it takes a [`SharedReadingStore::snapshot`] so a
//! cycle sees one consistent view.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Domain, Reading, ReadingKey, SeriesPoint};
use crate::metrics::METRICS;

/// What [`ReadingStore::record`] did with a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordOutcome {
    Inserted,
    /// A reading with the same key existed; its value is returned.
    Overwritten { previous: f64 },
}

#[derive(Debug, Clone, Default)]
struct DomainReadings {
    values: BTreeMap<ReadingKey, f64>,
}

impl DomainReadings {
    fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.values.keys().next_back().map(|k| k.timestamp)
    }
}

/// Time-stamped measurements grouped by domain.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    domains: BTreeMap<Domain, DomainReadings>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading, overwriting any reading with the same
    /// `(timestamp, site_id, metric)` in the same domain.
    pub fn record(&mut self, reading: Reading) -> RecordOutcome {
        let key = reading.key();
        let previous = self
            .domains
            .entry(reading.domain)
            .or_default()
            .values
            .insert(key, reading.value);

        METRICS.inc_readings_recorded();
        match previous {
            Some(previous) => {
                METRICS.inc_readings_overwritten();
                tracing::debug!(
                    domain = %reading.domain,
                    site = %reading.site_id,
                    metric = %reading.metric,
                    previous,
                    value = reading.value,
                    "reading overwritten"
                );
                RecordOutcome::Overwritten { previous }
            }
            None => RecordOutcome::Inserted,
        }
    }

    /// Readings at the domain's most recent timestamp, grouped by site.
    pub fn latest(&self, domain: Domain) -> BTreeMap<String, Vec<Reading>> {
        let mut grouped: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
        let Some(readings) = self.domains.get(&domain) else {
            return grouped;
        };
        let Some(latest) = readings.latest_timestamp() else {
            return grouped;
        };

        let start = ReadingKey {
            timestamp: latest,
            site_id: String::new(),
            metric: String::new(),
        };
        for (key, value) in readings.values.range(start..) {
            grouped
                .entry(key.site_id.clone())
                .or_default()
                .push(to_reading(domain, key, *value));
        }
        grouped
    }

    /// The most recent reading of every `(site, metric)` pair, ordered by
    /// site then metric.
    pub fn latest_per_pair(&self, domain: Domain) -> Vec<Reading> {
        let mut latest: BTreeMap<(&str, &str), (&ReadingKey, f64)> = BTreeMap::new();
        if let Some(readings) = self.domains.get(&domain) {
            // Ascending key order, so later entries are newer.
            for (key, value) in &readings.values {
                latest.insert((key.site_id.as_str(), key.metric.as_str()), (key, *value));
            }
        }
        latest
            .into_values()
            .map(|(key, value)| to_reading(domain, key, value))
            .collect()
    }

    /// Timestamp-ordered values of `metric`, optionally for one site only.
    pub fn series(&self, domain: Domain, metric: &str, site_id: Option<&str>) -> Vec<SeriesPoint> {
        let Some(readings) = self.domains.get(&domain) else {
            return Vec::new();
        };
        readings
            .values
            .iter()
            .filter(|(key, _)| key.metric == metric)
            .filter(|(key, _)| site_id.map_or(true, |site| key.site_id == site))
            .map(|(key, value)| SeriesPoint {
                timestamp: key.timestamp,
                site_id: key.site_id.clone(),
                value: *value,
            })
            .collect()
    }

    /// Full history of a domain in key order.
    pub fn readings(&self, domain: Domain) -> impl Iterator<Item = Reading> + '_ {
        self.domains
            .get(&domain)
            .into_iter()
            .flat_map(move |r| r.values.iter())
            .map(move |(key, value)| to_reading(domain, key, *value))
    }

    /// Latest timestamp recorded for a domain.
    pub fn latest_timestamp(&self, domain: Domain) -> Option<DateTime<Utc>> {
        self.domains.get(&domain).and_then(|r| r.latest_timestamp())
    }

    /// Distinct site ids of a domain, sorted.
    pub fn sites(&self, domain: Domain) -> Vec<String> {
        let mut sites: Vec<String> = self
            .domains
            .get(&domain)
            .map(|r| r.values.keys().map(|k| k.site_id.clone()).collect())
            .unwrap_or_default();
        sites.sort();
        sites.dedup();
        sites
    }

    /// Domains that hold at least one reading, in evaluation order.
    pub fn domains(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|(_, r)| !r.values.is_empty())
            .map(|(d, _)| *d)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.domains.values().map(|r| r.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every reading.
    pub fn clear(&mut self) {
        self.domains.clear();
    }
}

fn to_reading(domain: Domain, key: &ReadingKey, value: f64) -> Reading {
    Reading {
        timestamp: key.timestamp,
        site_id: key.site_id.clone(),
        domain,
        metric: key.metric.clone(),
        value,
    }
}

/// A [`ReadingStore`] that an ingestion task can write while evaluation
/// works on snapshots.
#[derive(Debug, Clone, Default)]
pub struct SharedReadingStore {
    inner: Arc<RwLock<ReadingStore>>,
}

impl SharedReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, reading: Reading) -> RecordOutcome {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record(reading)
    }

    /// Copy the current store under a read lock.
    pub fn snapshot(&self) -> ReadingStore {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn air(d: u32, site: &str, metric: &str, value: f64) -> Reading {
        Reading::new(day(d), site, Domain::Air, metric, value)
    }

    #[test]
    fn test_record_then_overwrite() {
        let mut store = ReadingStore::new();
        assert_eq!(store.record(air(1, "North Zone", "PM2.5", 30.0)), RecordOutcome::Inserted);
        assert_eq!(
            store.record(air(1, "North Zone", "PM2.5", 41.0)),
            RecordOutcome::Overwritten { previous: 30.0 }
        );
        assert_eq!(store.len(), 1);

        let latest = store.latest(Domain::Air);
        assert_eq!(latest["North Zone"][0].value, 41.0);
    }

    #[test]
    fn test_same_key_in_other_domain_does_not_collide() {
        let mut store = ReadingStore::new();
        store.record(air(1, "S1", "Turbidity", 1.0));
        let outcome = store.record(Reading::new(day(1), "S1", Domain::Water, "Turbidity", 2.0));
        assert_eq!(outcome, RecordOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_latest_only_returns_most_recent_timestamp() {
        let mut store = ReadingStore::new();
        store.record(air(1, "North Zone", "PM2.5", 10.0));
        store.record(air(2, "North Zone", "PM2.5", 20.0));
        store.record(air(2, "North Zone", "SO2", 5.0));
        store.record(air(2, "South Zone", "PM2.5", 30.0));

        let latest = store.latest(Domain::Air);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["North Zone"].len(), 2);
        assert!(latest["North Zone"].iter().all(|r| r.timestamp == day(2)));
        assert!(store.latest(Domain::Water).is_empty());
    }

    #[test]
    fn test_latest_per_pair_keeps_stale_sites() {
        let mut store = ReadingStore::new();
        store.record(air(1, "Quiet Site", "PM2.5", 12.0));
        store.record(air(3, "North Zone", "PM2.5", 20.0));
        store.record(air(2, "North Zone", "PM2.5", 99.0));

        let pairs = store.latest_per_pair(Domain::Air);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].site_id, "North Zone");
        assert_eq!(pairs[0].value, 20.0);
        assert_eq!(pairs[1].site_id, "Quiet Site");
    }

    #[test]
    fn test_series_is_time_ordered_and_filterable() {
        let mut store = ReadingStore::new();
        store.record(air(3, "A", "PM2.5", 3.0));
        store.record(air(1, "A", "PM2.5", 1.0));
        store.record(air(2, "B", "PM2.5", 2.0));
        store.record(air(2, "A", "SO2", 9.0));

        let all: Vec<f64> = store
            .series(Domain::Air, "PM2.5", None)
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(all, vec![1.0, 2.0, 3.0]);

        let only_a = store.series(Domain::Air, "PM2.5", Some("A"));
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|p| p.site_id == "A"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = ReadingStore::new();
        store.record(air(1, "A", "PM2.5", 3.0));
        store.clear();
        assert!(store.is_empty());
        assert!(store.domains().is_empty());
        assert_eq!(store.latest_timestamp(Domain::Air), None);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let shared = SharedReadingStore::new();
        shared.record(air(1, "A", "PM2.5", 3.0));
        let snapshot = shared.snapshot();
        shared.record(air(2, "A", "PM2.5", 4.0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(shared.len(), 2);
    }
}
