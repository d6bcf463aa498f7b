use thiserror::Error;

/// Pipeline-wide error types for Repute.
#[derive(Debug, Error)]
pub enum ReputeError {
    /// Malformed input record (missing timestamp, out-of-range value, bad weights).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-finite value in the trust matrix or a score computation.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// A collection source failed or timed out.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Score log store/load failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publisher failed to commit a snapshot.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for ReputeError {
    fn from(e: serde_json::Error) -> Self {
        ReputeError::Serialization(e.to_string())
    }
}
