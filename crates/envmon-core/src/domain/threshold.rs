//! Regulatory threshold rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::reading::Domain;

/// Alert severity attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Safe range for one metric in one domain.
///
/// At least one of `min`/`max` is set; the registry enforces this at load time.
/// The bounds themselves are part of the safe range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub domain: Domain,
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub severity: Severity,
    /// Display unit, e.g. `µg/m³`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Which side of a rule a value fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachDirection {
    High,
    Low,
}

impl fmt::Display for BreachDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachDirection::High => f.write_str("HIGH"),
            BreachDirection::Low => f.write_str("LOW"),
        }
    }
}

/// A value outside a rule's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub direction: BreachDirection,
    pub limit: f64,
    /// Distance past the violated bound; always positive.
    pub excursion: f64,
}

impl ThresholdRule {
    pub fn upper(domain: Domain, metric: impl Into<String>, max: f64, severity: Severity) -> Self {
        Self {
            domain,
            metric: metric.into(),
            min: None,
            max: Some(max),
            severity,
            unit: None,
        }
    }

    pub fn lower(domain: Domain, metric: impl Into<String>, min: f64, severity: Severity) -> Self {
        Self {
            domain,
            metric: metric.into(),
            min: Some(min),
            max: None,
            severity,
            unit: None,
        }
    }

    pub fn range(
        domain: Domain,
        metric: impl Into<String>,
        min: f64,
        max: f64,
        severity: Severity,
    ) -> Self {
        Self {
            domain,
            metric: metric.into(),
            min: Some(min),
            max: Some(max),
            severity,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Check `value` against both bounds. `None` means within range.
    pub fn check(&self, value: f64) -> Option<Breach> {
        if let Some(max) = self.max {
            if value > max {
                return Some(Breach {
                    direction: BreachDirection::High,
                    limit: max,
                    excursion: value - max,
                });
            }
        }
        if let Some(min) = self.min {
            if value < min {
                return Some(Breach {
                    direction: BreachDirection::Low,
                    limit: min,
                    excursion: min - value,
                });
            }
        }
        None
    }

    /// Human-readable safe range, e.g. `6.5..=8.5` or `<= 35`.
    pub fn describe_range(&self) -> String {
        let unit = self
            .unit
            .as_deref()
            .map(|u| format!(" {u}"))
            .unwrap_or_default();
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{min}..={max}{unit}"),
            (None, Some(max)) => format!("<= {max}{unit}"),
            (Some(min), None) => format!(">= {min}{unit}"),
            (None, None) => "unbounded".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_is_inclusive() {
        let rule = ThresholdRule::upper(Domain::Air, "PM2.5", 35.0, Severity::Critical);
        assert!(rule.check(35.0).is_none());
        let breach = rule.check(40.0).expect("breach");
        assert_eq!(breach.direction, BreachDirection::High);
        assert_eq!(breach.limit, 35.0);
        assert!((breach.excursion - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn range_detects_both_sides() {
        let rule = ThresholdRule::range(Domain::Water, "pH", 6.5, 8.5, Severity::Critical);
        assert_eq!(rule.check(6.0).unwrap().direction, BreachDirection::Low);
        assert_eq!(rule.check(9.0).unwrap().direction, BreachDirection::High);
        assert!(rule.check(7.2).is_none());
        assert!(rule.check(6.5).is_none());
        assert!(rule.check(8.5).is_none());
    }

    #[test]
    fn lower_only_rule_ignores_high_values() {
        let rule = ThresholdRule::lower(Domain::Water, "Dissolved_Oxygen", 4.0, Severity::Warning);
        assert!(rule.check(1_000.0).is_none());
        assert!(rule.check(3.9).is_some());
    }

    #[test]
    fn describe_range_includes_unit() {
        let rule =
            ThresholdRule::upper(Domain::Air, "PM2.5", 35.0, Severity::Critical).with_unit("µg/m³");
        assert_eq!(rule.describe_range(), "<= 35 µg/m³");
    }

    #[test]
    fn severity_defaults_to_warning_when_omitted() {
        let rule: ThresholdRule =
            toml::from_str("domain = \"air\"\nmetric = \"SO2\"\nmax = 20.0\n").unwrap();
        assert_eq!(rule.severity, Severity::Warning);
        assert_eq!(rule.min, None);
    }
}
