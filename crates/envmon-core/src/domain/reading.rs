//! Time-stamped sensor readings and the measurement domains they belong to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::MonitorError;

/// Category of environmental measurement.
///
/// Variant order is the fixed evaluation order: air first, then water,
/// then biodiversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Air,
    Water,
    Biodiversity,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Air => "air",
            Domain::Water => "water",
            Domain::Biodiversity => "biodiversity",
        }
    }

    pub fn all() -> [Domain; 3] {
        [Domain::Air, Domain::Water, Domain::Biodiversity]
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "air" => Ok(Domain::Air),
            "water" => Ok(Domain::Water),
            "biodiversity" => Ok(Domain::Biodiversity),
            other => Err(MonitorError::InvalidReading(format!(
                "unknown domain '{other}'"
            ))),
        }
    }
}

/// A single measurement from one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub site_id: String,
    pub domain: Domain,
    pub metric: String,
    pub value: f64,
}

impl Reading {
    pub fn new(
        timestamp: DateTime<Utc>,
        site_id: impl Into<String>,
        domain: Domain,
        metric: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            site_id: site_id.into(),
            domain,
            metric: metric.into(),
            value,
        }
    }

    /// Reject readings that cannot be meaningfully stored.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.site_id.trim().is_empty() {
            return Err(MonitorError::InvalidReading(
                "site_id must not be empty".to_string(),
            ));
        }
        if self.metric.trim().is_empty() {
            return Err(MonitorError::InvalidReading(
                "metric must not be empty".to_string(),
            ));
        }
        if !self.value.is_finite() {
            return Err(MonitorError::InvalidReading(format!(
                "{}/{} at {} has non-finite value {}",
                self.site_id, self.metric, self.timestamp, self.value
            )));
        }
        Ok(())
    }

    /// Identity of this reading within its domain.
    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            timestamp: self.timestamp,
            site_id: self.site_id.clone(),
            metric: self.metric.clone(),
        }
    }
}

/// `(timestamp, site_id, metric)`: unique within a domain.
///
/// Ordering is timestamp first, so iterating a keyed map yields readings in
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReadingKey {
    pub timestamp: DateTime<Utc>,
    pub site_id: String,
    pub metric: String,
}

/// One point of a metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub site_id: String,
    pub value: f64,
}
