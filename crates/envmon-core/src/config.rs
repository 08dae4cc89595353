//! Start-up configuration for the monitoring binaries.
//!
//! Paths resolve from CLI flags first, then environment variables, then the
//! defaults below:
//!
//! | Variable              | Default                   |
//! |-----------------------|---------------------------|
//! | `ENVMON_THRESHOLDS`   | `config/thresholds.toml`  |
//! | `ENVMON_COMPLIANCE`   | `config/compliance.toml`  |
//! | `ENVMON_LOG_FORMAT`   | text (`json` for JSON)    |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregator::ComplianceTable;
use crate::domain::Result;
use crate::monitor::Monitor;
use crate::registry::ThresholdRegistry;
use crate::telemetry::LogFormat;

pub const DEFAULT_THRESHOLDS_PATH: &str = "config/thresholds.toml";
pub const DEFAULT_COMPLIANCE_PATH: &str = "config/compliance.toml";

/// Resolved configuration sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub thresholds_path: PathBuf,
    /// `None` runs without compliance parameters.
    pub compliance_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds_path: PathBuf::from(DEFAULT_THRESHOLDS_PATH),
            compliance_path: Some(PathBuf::from(DEFAULT_COMPLIANCE_PATH)),
            log_format: LogFormat::Text,
        }
    }
}

impl MonitorConfig {
    /// Resolve from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let thresholds_path = lookup("ENVMON_THRESHOLDS")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.thresholds_path);
        let compliance_path = lookup("ENVMON_COMPLIANCE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or(defaults.compliance_path);
        // An unrecognised format falls back to text; logging is not up yet.
        let log_format = lookup("ENVMON_LOG_FORMAT")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            thresholds_path,
            compliance_path,
            log_format,
        }
    }

    pub fn with_thresholds(mut self, path: impl Into<PathBuf>) -> Self {
        self.thresholds_path = path.into();
        self
    }

    pub fn with_compliance(mut self, path: Option<PathBuf>) -> Self {
        self.compliance_path = path;
        self
    }

    pub fn load_registry(&self) -> Result<ThresholdRegistry> {
        ThresholdRegistry::from_path(&self.thresholds_path)
    }

    /// Load the compliance table.
    ///
    /// A missing file at the default location yields an empty table; an
    /// explicitly configured path that cannot be read is an error.
    pub fn load_compliance(&self) -> Result<ComplianceTable> {
        match &self.compliance_path {
            None => Ok(ComplianceTable::new()),
            Some(path) if is_default_missing(path) => {
                tracing::debug!(path = %path.display(), "no compliance file; using empty table");
                Ok(ComplianceTable::new())
            }
            Some(path) => ComplianceTable::from_path(path),
        }
    }

    /// Load every configuration source and build an initialized [`Monitor`].
    ///
    /// Any configuration error is fatal and returned before a monitor exists.
    pub fn build_monitor(&self) -> Result<Monitor> {
        let registry = Arc::new(self.load_registry()?);
        let compliance = self.load_compliance()?;
        Ok(Monitor::new(registry).with_compliance(compliance))
    }
}

fn is_default_missing(path: &Path) -> bool {
    path == Path::new(DEFAULT_COMPLIANCE_PATH) && !path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = MonitorConfig::from_lookup(lookup(&[]));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_env_overrides_paths_and_format() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("ENVMON_THRESHOLDS", "/etc/envmon/limits.toml"),
            ("ENVMON_COMPLIANCE", "/etc/envmon/eia.toml"),
            ("ENVMON_LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.thresholds_path, PathBuf::from("/etc/envmon/limits.toml"));
        assert_eq!(
            config.compliance_path,
            Some(PathBuf::from("/etc/envmon/eia.toml"))
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_falls_back_to_text() {
        let config = MonitorConfig::from_lookup(lookup(&[("ENVMON_LOG_FORMAT", "xml")]));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_blank_env_value_falls_back_to_default() {
        let config = MonitorConfig::from_lookup(lookup(&[("ENVMON_THRESHOLDS", "  ")]));
        assert_eq!(config.thresholds_path, PathBuf::from(DEFAULT_THRESHOLDS_PATH));
    }

    #[test]
    fn test_missing_explicit_thresholds_file_is_fatal() {
        let config = MonitorConfig::default().with_thresholds("/nonexistent/thresholds.toml");
        let err = config.build_monitor().unwrap_err();
        assert!(err.is_fatal());
    }
}
