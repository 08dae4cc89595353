//! Domain models for the monitoring core.
//!
//! Canonical definitions for the core entities:
//! - `Reading`: an immutable measurement from one site
//! - `ThresholdRule`: the safe range for one metric in one domain
//! - `ComplianceRecord`: a regulatory parameter's rate and status band
//! - `Alert`: a breach condition raised by one evaluation

pub mod alert;
pub mod compliance;
pub mod error;
pub mod reading;
pub mod threshold;

// Re-export main types and errors
pub use alert::Alert;
pub use compliance::{ComplianceParameter, ComplianceRecord, ComplianceStatus};
pub use error::{ConfigError, MonitorError, Result};
pub use reading::{Domain, Reading, ReadingKey, SeriesPoint};
pub use threshold::{Breach, BreachDirection, Severity, ThresholdRule};
