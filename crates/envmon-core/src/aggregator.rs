//! Point summaries, compliance scoring and the headline summary.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alerts::AlertOutcome;
use crate::classifier::{classify_value, StationStatus};
use crate::domain::{
    ComplianceParameter, ComplianceRecord, ConfigError, Domain, Result,
};
use crate::registry::ThresholdRegistry;
use crate::store::ReadingStore;

/// Mean of the latest reading per site for `metric`.
///
/// `None` when no site has reported the metric.
pub fn point_summary(store: &ReadingStore, domain: Domain, metric: &str) -> Option<f64> {
    let values: Vec<f64> = store
        .latest_per_pair(domain)
        .into_iter()
        .filter(|r| r.metric == metric)
        .map(|r| r.value)
        .collect();
    mean(&values)
}

/// Sum of `metric` over every site at the domain's most recent timestamp.
///
/// Independent of station: all sites reporting at that timestamp contribute.
pub fn total_at_latest(store: &ReadingStore, domain: Domain, metric: &str) -> Option<f64> {
    let values: Vec<f64> = store
        .latest(domain)
        .into_values()
        .flatten()
        .filter(|r| r.metric == metric)
        .map(|r| r.value)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ComplianceFile {
    #[serde(default)]
    parameters: Vec<ComplianceParameter>,
}

/// Externally supplied compliance rates, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceTable {
    parameters: Vec<ComplianceParameter>,
}

impl ComplianceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(parameters: Vec<ComplianceParameter>) -> Result<Self> {
        let mut seen = HashSet::new();
        for p in &parameters {
            validate_parameter(p)?;
            if !seen.insert(p.name.as_str()) {
                return Err(ConfigError::DuplicateParameter(p.name.clone()).into());
            }
        }
        Ok(Self { parameters })
    }

    /// Parse a TOML file of `[[parameters]] name = .., rate = ..` entries.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ComplianceFile = toml::from_str(s)?;
        Self::from_parameters(file.parameters)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let table = Self::from_toml_str(&raw)?;
        crate::obs::emit_config_loaded(&path.display().to_string(), table.len());
        Ok(table)
    }

    /// Insert or replace the rate of a parameter. New parameters go last.
    pub fn set_rate(&mut self, name: &str, rate: f64) -> Result<()> {
        let candidate = ComplianceParameter {
            name: name.to_string(),
            rate,
        };
        validate_parameter(&candidate)?;
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.rate = rate,
            None => self.parameters.push(candidate),
        }
        Ok(())
    }

    /// Records derived from the current rates.
    pub fn records(&self) -> Vec<ComplianceRecord> {
        self.parameters.iter().map(ComplianceRecord::from).collect()
    }

    /// Mean rate across parameters.
    pub fn overall_rate(&self) -> Option<f64> {
        let rates: Vec<f64> = self.parameters.iter().map(|p| p.rate).collect();
        mean(&rates)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

fn validate_parameter(p: &ComplianceParameter) -> std::result::Result<(), ConfigError> {
    if p.name.trim().is_empty() {
        return Err(ConfigError::EmptyParameter);
    }
    if !p.rate.is_finite() || !(0.0..=100.0).contains(&p.rate) {
        return Err(ConfigError::RateOutOfRange {
            parameter: p.name.clone(),
            rate: p.rate,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Headline
// ---------------------------------------------------------------------------

/// Status of a headline average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadlineStatus {
    Normal,
    Alert,
    /// The headline metric has no threshold rule.
    Unclassified,
    NoData,
}

impl fmt::Display for HeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadlineStatus::Normal => f.write_str("Normal"),
            HeadlineStatus::Alert => f.write_str("Alert"),
            HeadlineStatus::Unclassified => f.write_str("Unclassified"),
            HeadlineStatus::NoData => f.write_str("No data"),
        }
    }
}

/// Averaged headline metric with its threshold status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineMetric {
    pub domain: Domain,
    pub metric: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub status: HeadlineStatus,
}

/// Executive summary of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSummary {
    pub air: HeadlineMetric,
    pub water: HeadlineMetric,
    /// Sum of the biodiversity headline metric at the latest timestamp.
    pub biodiversity_index: Option<f64>,
    pub overall_compliance: Option<f64>,
    /// Offending readings across every alert.
    pub active_alerts: usize,
    /// Distinct site ids across all domains.
    pub monitored_sites: usize,
}

fn headline_metric(
    registry: &ThresholdRegistry,
    store: &ReadingStore,
    domain: Domain,
    metric: &str,
) -> HeadlineMetric {
    let value = point_summary(store, domain, metric);
    let status = match value {
        None => HeadlineStatus::NoData,
        Some(v) => match classify_value(registry, domain, metric, v) {
            StationStatus::Good => HeadlineStatus::Normal,
            StationStatus::Poor => HeadlineStatus::Alert,
            StationStatus::Unclassified => HeadlineStatus::Unclassified,
        },
    };
    HeadlineMetric {
        domain,
        metric: metric.to_string(),
        value,
        unit: registry
            .rule_for(domain, metric)
            .and_then(|r| r.unit.clone()),
        status,
    }
}

/// Build the headline summary for one evaluation.
pub fn headline(
    registry: &ThresholdRegistry,
    store: &ReadingStore,
    compliance: &ComplianceTable,
    alerts: &AlertOutcome,
) -> HeadlineSummary {
    let names = registry.headline();
    let monitored_sites = Domain::all()
        .iter()
        .flat_map(|d| store.sites(*d))
        .collect::<BTreeSet<_>>()
        .len();

    HeadlineSummary {
        air: headline_metric(registry, store, Domain::Air, &names.air_metric),
        water: headline_metric(registry, store, Domain::Water, &names.water_metric),
        biodiversity_index: total_at_latest(store, Domain::Biodiversity, &names.biodiversity_metric),
        overall_compliance: compliance.overall_rate(),
        active_alerts: alerts.alerts().iter().map(|a| a.offending_readings).sum(),
        monitored_sites,
    }
}
