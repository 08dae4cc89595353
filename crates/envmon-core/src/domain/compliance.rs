//! Regulatory compliance rates and their status bands.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower edge of the `Compliant` band.
pub const COMPLIANT_MIN_RATE: f64 = 90.0;
/// Lower edge of the `PartiallyCompliant` band.
pub const PARTIAL_MIN_RATE: f64 = 75.0;

/// Status band for a compliance rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    NeedsImprovement,
    PartiallyCompliant,
    Compliant,
}

impl ComplianceStatus {
    /// Band a rate. Each band includes its lower edge: 90.0 is `Compliant`,
    /// 75.0 is `PartiallyCompliant`.
    pub fn from_rate(rate: f64) -> Self {
        if rate >= COMPLIANT_MIN_RATE {
            ComplianceStatus::Compliant
        } else if rate >= PARTIAL_MIN_RATE {
            ComplianceStatus::PartiallyCompliant
        } else {
            ComplianceStatus::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::PartiallyCompliant => "Needs attention",
            ComplianceStatus::NeedsImprovement => "Needs improvement",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named regulatory parameter with its externally supplied rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceParameter {
    pub name: String,
    pub rate: f64,
}

/// Derived view of a [`ComplianceParameter`]. Built on read; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub parameter: String,
    pub rate: f64,
    pub status: ComplianceStatus,
}

impl From<&ComplianceParameter> for ComplianceRecord {
    fn from(p: &ComplianceParameter) -> Self {
        Self {
            parameter: p.name.clone(),
            rate: p.rate,
            status: ComplianceStatus::from_rate(p.rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_inclusive_at_the_lower_end() {
        assert_eq!(ComplianceStatus::from_rate(90.0), ComplianceStatus::Compliant);
        assert_eq!(
            ComplianceStatus::from_rate(89.9),
            ComplianceStatus::PartiallyCompliant
        );
        assert_eq!(
            ComplianceStatus::from_rate(75.0),
            ComplianceStatus::PartiallyCompliant
        );
        assert_eq!(
            ComplianceStatus::from_rate(74.9),
            ComplianceStatus::NeedsImprovement
        );
    }

    #[test]
    fn banding_is_monotonic() {
        let mut previous = ComplianceStatus::from_rate(0.0);
        let mut rate = 0.0;
        while rate <= 100.0 {
            let status = ComplianceStatus::from_rate(rate);
            assert!(status >= previous, "band dropped at rate {rate}");
            previous = status;
            rate += 0.5;
        }
    }

    #[test]
    fn record_is_derived_from_rate() {
        let param = ComplianceParameter {
            name: "Waste Management".to_string(),
            rate: 80.0,
        };
        let record = ComplianceRecord::from(&param);
        assert_eq!(record.status, ComplianceStatus::PartiallyCompliant);
        assert_eq!(record.status.to_string(), "Needs attention");
    }
}
