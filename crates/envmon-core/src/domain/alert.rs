//! Alerts raised by the alert engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Domain;
use super::threshold::{BreachDirection, Severity};

/// One threshold breach condition for a `(domain, metric)` pair.
///
/// Created fresh by every evaluation; alerts carry no acknowledgement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub domain: Domain,
    pub severity: Severity,
    pub message: String,
    pub triggering_metric: String,
    /// Site of the most recent offending reading.
    pub triggering_site: String,
    /// Timestamp of the most recent offending reading.
    pub timestamp: DateTime<Utc>,
    pub direction: BreachDirection,
    /// Every offending reading for this pair across the full history.
    pub offending_readings: usize,
    /// Distinct offending sites, sorted.
    pub sites: Vec<String>,
}

impl Alert {
    /// Render `HIGH PM2.5 levels detected in Industrial Area` style messages.
    pub fn compose_message(
        direction: BreachDirection,
        metric: &str,
        triggering_site: &str,
        site_count: usize,
    ) -> String {
        if site_count > 1 {
            format!(
                "{direction} {metric} levels detected in {site_count} stations (latest: {triggering_site})"
            )
        } else {
            format!("{direction} {metric} levels detected in {triggering_site}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_site_message_names_the_site() {
        let msg = Alert::compose_message(BreachDirection::High, "PM2.5", "Industrial Area", 1);
        assert_eq!(msg, "HIGH PM2.5 levels detected in Industrial Area");
    }

    #[test]
    fn multi_site_message_counts_stations() {
        let msg = Alert::compose_message(BreachDirection::Low, "pH", "Canal Industrial", 2);
        assert_eq!(
            msg,
            "LOW pH levels detected in 2 stations (latest: Canal Industrial)"
        );
    }
}
