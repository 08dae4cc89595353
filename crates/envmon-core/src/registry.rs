//! Threshold registry.
//!
//! Maps `(domain, metric)` to a [`ThresholdRule`]. The registry is built once
//! from configuration, validated as a whole, and read-only afterwards; share it
//! as `Arc<ThresholdRegistry>`.
//!
//! # File format
//!
//! ```toml
//! [headline]
//! air_metric = "PM2.5"
//!
//! [[rules]]
//! domain = "air"
//! metric = "PM2.5"
//! max = 35.0
//! severity = "critical"
//! unit = "µg/m³"
//! ```
//!
//! Rules keep the order they are declared in; the alert engine relies on it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, Domain, Result, ThresholdRule};

/// Metric names used for the headline summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineMetrics {
    pub air_metric: String,
    pub water_metric: String,
    pub biodiversity_metric: String,
}

impl Default for HeadlineMetrics {
    fn default() -> Self {
        Self {
            air_metric: "PM2.5".to_string(),
            water_metric: "pH".to_string(),
            biodiversity_metric: "Count".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThresholdFile {
    #[serde(default)]
    headline: HeadlineMetrics,
    #[serde(default)]
    rules: Vec<ThresholdRule>,
}

/// Validated, immutable set of threshold rules.
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    rules: Vec<ThresholdRule>,
    index: HashMap<(Domain, String), usize>,
    headline: HeadlineMetrics,
}

impl ThresholdRegistry {
    /// Build a registry from rules in declaration order.
    pub fn from_rules(rules: Vec<ThresholdRule>) -> Result<Self> {
        Self::build(rules, HeadlineMetrics::default())
    }

    /// Parse and validate a TOML threshold file.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ThresholdFile = toml::from_str(s)?;
        Self::build(file.rules, file.headline)
    }

    /// Read, parse and validate a TOML threshold file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let registry = Self::from_toml_str(&raw)?;
        crate::obs::emit_config_loaded(&path.display().to_string(), registry.len());
        Ok(registry)
    }

    fn build(rules: Vec<ThresholdRule>, headline: HeadlineMetrics) -> Result<Self> {
        if rules.is_empty() {
            return Err(ConfigError::NoRules.into());
        }

        let mut index = HashMap::with_capacity(rules.len());
        for (pos, rule) in rules.iter().enumerate() {
            validate_rule(rule)?;
            let key = (rule.domain, rule.metric.clone());
            if index.insert(key, pos).is_some() {
                return Err(ConfigError::DuplicateRule {
                    domain: rule.domain,
                    metric: rule.metric.clone(),
                }
                .into());
            }
        }

        Ok(Self {
            rules,
            index,
            headline,
        })
    }

    /// Rule for a metric, or `None` when the metric is unclassified.
    pub fn rule_for(&self, domain: Domain, metric: &str) -> Option<&ThresholdRule> {
        self.index
            .get(&(domain, metric.to_string()))
            .map(|&pos| &self.rules[pos])
    }

    /// Rules of one domain in declaration order.
    pub fn rules(&self, domain: Domain) -> impl Iterator<Item = &ThresholdRule> {
        self.rules.iter().filter(move |r| r.domain == domain)
    }

    /// Every rule in declaration order.
    pub fn all_rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn headline(&self) -> &HeadlineMetrics {
        &self.headline
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate_rule(rule: &ThresholdRule) -> std::result::Result<(), ConfigError> {
    if rule.metric.trim().is_empty() {
        return Err(ConfigError::EmptyMetric {
            domain: rule.domain,
        });
    }
    if rule.min.is_none() && rule.max.is_none() {
        return Err(ConfigError::MissingBound {
            domain: rule.domain,
            metric: rule.metric.clone(),
        });
    }
    let finite = rule.min.map_or(true, f64::is_finite) && rule.max.map_or(true, f64::is_finite);
    if !finite {
        return Err(ConfigError::NonFiniteBound {
            domain: rule.domain,
            metric: rule.metric.clone(),
        });
    }
    if let (Some(min), Some(max)) = (rule.min, rule.max) {
        if min > max {
            return Err(ConfigError::InvertedBounds {
                domain: rule.domain,
                metric: rule.metric.clone(),
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Metrics observed in readings that have no rule, per domain.
pub fn unclassified_metrics<'a>(
    registry: &ThresholdRegistry,
    domain: Domain,
    metrics: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut missing: Vec<String> = metrics
        .into_iter()
        .filter(|m| registry.rule_for(domain, m).is_none())
        .filter(|m| seen.insert(*m))
        .map(str::to_string)
        .collect();
    missing.sort();
    missing
}
