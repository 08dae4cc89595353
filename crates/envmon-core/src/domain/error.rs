//! Domain-level error taxonomy for the monitoring core.

use super::reading::Domain;

/// Errors produced while validating threshold or compliance configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no threshold rules configured")]
    NoRules,

    #[error("rule metric name must not be empty ({domain})")]
    EmptyMetric { domain: Domain },

    #[error("rule {domain}/{metric} has neither a min nor a max bound")]
    MissingBound { domain: Domain, metric: String },

    #[error("rule {domain}/{metric} has a non-finite bound")]
    NonFiniteBound { domain: Domain, metric: String },

    #[error("rule {domain}/{metric} has min {min} greater than max {max}")]
    InvertedBounds {
        domain: Domain,
        metric: String,
        min: f64,
        max: f64,
    },

    #[error("duplicate rule for {domain}/{metric}")]
    DuplicateRule { domain: Domain, metric: String },

    #[error("compliance parameter name must not be empty")]
    EmptyParameter,

    #[error("duplicate compliance parameter: {0}")]
    DuplicateParameter(String),

    #[error("compliance rate for {parameter} must be within 0..=100, got {rate}")]
    RateOutOfRange { parameter: String, rate: f64 },
}

/// Monitoring core errors.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Whether this error must abort start-up.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::Configuration(_) | MonitorError::Toml(_) | MonitorError::Io(_)
        )
    }
}

/// Result type for monitoring core operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = MonitorError::from(ConfigError::MissingBound {
            domain: Domain::Air,
            metric: "PM2.5".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("air/PM2.5"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_inverted_bounds_mentions_both_values() {
        let err = ConfigError::InvertedBounds {
            domain: Domain::Water,
            metric: "pH".to_string(),
            min: 8.5,
            max: 6.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("8.5"));
        assert!(msg.contains("6.5"));
    }

    #[test]
    fn test_invalid_reading_is_not_fatal() {
        let err = MonitorError::InvalidReading("value is NaN".to_string());
        assert!(err.to_string().contains("invalid reading"));
        assert!(!err.is_fatal());
    }
}
