//! Process-wide counters for ingestion and evaluation.
//!
//! Increments happen where the counted thing happens: the store counts
//! readings, the evaluation cycle counts cycles and raised alerts. Read-only
//! getters on [`Monitor`](crate::monitor::Monitor) never touch these.
//! Binaries call [`Metrics::flush`] once on exit.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub static METRICS: Metrics = Metrics::new();

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub readings_recorded: u64,
    /// Subset of `readings_recorded` that replaced an existing key.
    pub readings_overwritten: u64,
    pub cycles_evaluated: u64,
    /// Alerts produced by evaluation cycles, one per alert per cycle.
    pub alerts_raised: u64,
}

#[derive(Debug)]
pub struct Metrics {
    readings_recorded: AtomicU64,
    readings_overwritten: AtomicU64,
    cycles_evaluated: AtomicU64,
    alerts_raised: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            readings_recorded: AtomicU64::new(0),
            readings_overwritten: AtomicU64::new(0),
            cycles_evaluated: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    /// Every accepted reading, inserted or overwriting.
    pub fn inc_readings_recorded(&self) {
        Self::bump(&self.readings_recorded, "readings_recorded");
    }

    pub fn inc_readings_overwritten(&self) {
        Self::bump(&self.readings_overwritten, "readings_overwritten");
    }

    pub fn inc_cycles(&self) {
        Self::bump(&self.cycles_evaluated, "cycles_evaluated");
    }

    pub fn inc_alerts_raised(&self) {
        Self::bump(&self.alerts_raised, "alerts_raised");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_recorded: self.readings_recorded(),
            readings_overwritten: self.readings_overwritten(),
            cycles_evaluated: self.cycles_evaluated(),
            alerts_raised: self.alerts_raised(),
        }
    }

    /// Log the current snapshot as one `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            readings_recorded = s.readings_recorded,
            readings_overwritten = s.readings_overwritten,
            cycles_evaluated = s.cycles_evaluated,
            alerts_raised = s.alerts_raised,
        );
    }

    pub fn readings_recorded(&self) -> u64 {
        self.readings_recorded.load(Ordering::Relaxed)
    }

    pub fn readings_overwritten(&self) -> u64 {
        self.readings_overwritten.load(Ordering::Relaxed)
    }

    pub fn cycles_evaluated(&self) -> u64 {
        self.cycles_evaluated.load(Ordering::Relaxed)
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised.load(Ordering::Relaxed)
    }

    /// Zero every counter. Tests only; the binaries never reset.
    pub fn reset(&self) {
        for counter in [
            &self.readings_recorded,
            &self.readings_overwritten,
            &self.cycles_evaluated,
            &self.alerts_raised,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_increments() {
        let m = Metrics::new();
        m.inc_readings_recorded();
        m.inc_readings_recorded();
        m.inc_readings_overwritten();
        m.inc_cycles();
        m.inc_alerts_raised();

        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                readings_recorded: 2,
                readings_overwritten: 1,
                cycles_evaluated: 1,
                alerts_raised: 1,
            }
        );
    }

    #[test]
    fn test_reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_readings_recorded();
        m.inc_cycles();
        m.inc_alerts_raised();
        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
