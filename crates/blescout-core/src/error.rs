//! Error types for the detection correlation engine.

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// A resolvable private address that matches none of the configured keys is
/// *not* an error; it is reported through
/// [`RecordOutcome::Unresolved`](crate::ledger::RecordOutcome::Unresolved).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// An identity resolving key could not be parsed.
    #[error("invalid IRK: {reason}")]
    InvalidKeyFormat { reason: String },

    /// A raw detection event was structurally unusable.
    #[error("invalid detection: {reason}")]
    InvalidDetection { reason: String },

    /// A session or estimator parameter was rejected at setup time.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl ScanError {
    #[must_use]
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_detection(reason: impl Into<String>) -> Self {
        Self::InvalidDetection {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Convenience result alias used across the crate.
pub type ScanResult<T> = Result<T, ScanError>;
