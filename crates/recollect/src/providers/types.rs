//! Collaborator error type
//!
//! Providers report failures in their own terms; the engine decides whether a
//! failure is fatal (generation) or recovered (embedding).

use crate::error::RecollectError;

/// Provider-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Could not reach the provider: connect failure, timeout, exhausted retries
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Map a failure of the text-generation collaborator
    pub fn into_generation_error(self) -> RecollectError {
        match self {
            ProviderError::Rejected { .. } => RecollectError::GenerationRejected(self.to_string()),
            ProviderError::Config(msg) => RecollectError::Config(msg),
            other => RecollectError::GenerationUnavailable(other.to_string()),
        }
    }

    /// Map a failure of the embedding collaborator
    pub fn into_embedding_error(self) -> RecollectError {
        match self {
            ProviderError::Config(msg) => RecollectError::Config(msg),
            other => RecollectError::Embedding(other.to_string()),
        }
    }
}
