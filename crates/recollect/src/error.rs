//! Error types for Recollect

use thiserror::Error;

/// Main error type for Recollect operations
#[derive(Error, Debug)]
pub enum RecollectError {
    /// Storage-related errors (LanceDB, file system, etc.)
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Embedding collaborator failed. Always recovered inside a turn.
    #[error("Embedding unavailable: {0}")]
    Embedding(String),

    /// Text generation could not be reached (network error, timeout)
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// Text generation answered with a non-success response
    #[error("Generation rejected: {0}")]
    GenerationRejected(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable identifier or message
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecollectError {
    /// True for failures of the generation collaborator
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            RecollectError::GenerationUnavailable(_) | RecollectError::GenerationRejected(_)
        )
    }
}

/// Result type alias for Recollect operations
pub type Result<T> = std::result::Result<T, RecollectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecollectError::Storage("table missing".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: table missing");

        let err = RecollectError::GenerationRejected("HTTP 500".to_string());
        assert_eq!(err.to_string(), "Generation rejected: HTTP 500");
    }

    #[test]
    fn test_generation_failure_classification() {
        assert!(RecollectError::GenerationUnavailable("timeout".into()).is_generation_failure());
        assert!(RecollectError::GenerationRejected("404".into()).is_generation_failure());
        assert!(!RecollectError::Embedding("down".into()).is_generation_failure());
        assert!(!RecollectError::Storage("down".into()).is_generation_failure());
    }
}
