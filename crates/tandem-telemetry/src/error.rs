//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A filter directive did not parse.
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// The rejected directive string.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// An unknown output format name.
    #[error("Unknown log format '{0}' (expected json, pretty or compact)")]
    UnknownFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("already set".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: already set");

        let err = TelemetryError::UnknownFormat("xml".to_string());
        assert!(err.to_string().contains("'xml'"));
    }

    #[test]
    fn test_invalid_filter_display() {
        let err = TelemetryError::InvalidFilter {
            directive: "tandem=loud".to_string(),
            reason: "invalid level".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid log filter 'tandem=loud': invalid level"
        );
    }
}
