//! Error types for Ever-Thinker
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Ever-Thinker
#[derive(Debug, Error)]
pub enum EverThinkerError {
    /// A single analyzer failed; absorbed at the fan-out boundary
    #[error("Analyzer '{analyzer}' failed: {reason}")]
    AnalyzerFailed { analyzer: String, reason: String },

    /// The acceptance-rate oracle could not answer
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// An analyzer emitted an improvement that breaks the data contract
    #[error("Contract violation by analyzer '{analyzer}': {reason}")]
    ContractViolation { analyzer: String, reason: String },

    /// Feedback channel error (submission or correlation)
    #[error("Feedback error: {0}")]
    Feedback(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EverThinkerError {
    /// Whether a cycle may absorb this error and keep going.
    ///
    /// Contract violations and state misuse are defects in the caller and
    /// must reach the host.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            EverThinkerError::ContractViolation { .. } | EverThinkerError::InvalidState(_)
        )
    }
}

/// Result type alias for Ever-Thinker operations
pub type Result<T> = std::result::Result<T, EverThinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_failed_error() {
        let err = EverThinkerError::AnalyzerFailed {
            analyzer: "performance".to_string(),
            reason: "file vanished".to_string(),
        };
        assert_eq!(err.to_string(), "Analyzer 'performance' failed: file vanished");
    }

    #[test]
    fn test_contract_violation_error() {
        let err = EverThinkerError::ContractViolation {
            analyzer: "ux".to_string(),
            reason: "empty category".to_string(),
        };
        assert_eq!(err.to_string(), "Contract violation by analyzer 'ux': empty category");
    }

    #[test]
    fn test_oracle_unavailable_error() {
        let err = EverThinkerError::OracleUnavailable("store locked".to_string());
        assert_eq!(err.to_string(), "Oracle unavailable: store locked");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = EverThinkerError::InvalidState("cycle in flight".to_string());
        assert_eq!(err.to_string(), "Invalid state: cycle in flight");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(EverThinkerError::OracleUnavailable("x".into()).is_recoverable());
        assert!(EverThinkerError::Feedback("x".into()).is_recoverable());
        assert!(
            EverThinkerError::AnalyzerFailed {
                analyzer: "a".into(),
                reason: "b".into()
            }
            .is_recoverable()
        );
        assert!(
            !EverThinkerError::ContractViolation {
                analyzer: "a".into(),
                reason: "b".into()
            }
            .is_recoverable()
        );
        assert!(!EverThinkerError::InvalidState("x".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EverThinkerError = io_err.into();
        assert!(matches!(err, EverThinkerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: EverThinkerError = json_err.into();
        assert!(matches!(err, EverThinkerError::Json(_)));
    }
}
