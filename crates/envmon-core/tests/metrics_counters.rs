//! Global counter semantics. Kept to a single test so nothing else in this
//! binary touches `METRICS` concurrently.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use envmon_core::{
    Domain, Monitor, Reading, Severity, ThresholdRegistry, ThresholdRule, METRICS,
};

#[test]
fn only_evaluation_cycles_count_alerts() {
    let registry = ThresholdRegistry::from_rules(vec![ThresholdRule::upper(
        Domain::Air,
        "PM2.5",
        35.0,
        Severity::Critical,
    )])
    .unwrap();
    let mut monitor = Monitor::new(Arc::new(registry));
    monitor
        .record(Reading::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            "Industrial Area",
            Domain::Air,
            "PM2.5",
            50.0,
        ))
        .unwrap();

    METRICS.reset();
    for _ in 0..5 {
        assert_eq!(monitor.get_alerts().len(), 1);
        assert_eq!(monitor.get_headline().active_alerts, 1);
    }
    let after_getters = METRICS.snapshot();
    assert_eq!(after_getters.alerts_raised, 0);
    assert_eq!(after_getters.cycles_evaluated, 0);

    monitor.evaluate();
    monitor.evaluate();
    let after_cycles = METRICS.snapshot();
    assert_eq!(after_cycles.cycles_evaluated, 2);
    assert_eq!(after_cycles.alerts_raised, 2);
}
