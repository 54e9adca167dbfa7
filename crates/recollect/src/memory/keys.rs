//! Identifier validation and partition keys
//!
//! User and session identifiers arrive from callers as free text. They must
//! be alphanumeric with underscores and hyphens, max 128 chars, because they
//! end up inside storage filter expressions.

use thiserror::Error;

/// Maximum length for user and session identifiers
const MAX_IDENTIFIER_LEN: usize = 128;

/// Errors that can occur during identifier validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentifierError {
    #[error("Identifier cannot be empty")]
    Empty,

    #[error("Identifier contains invalid characters: allowed are a-z, A-Z, 0-9, _, -")]
    InvalidChars,

    #[error("Identifier exceeds maximum length of {MAX_IDENTIFIER_LEN} characters")]
    TooLong,
}

/// A validated user or session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), IdentifierError> {
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if s.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong);
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IdentifierError::InvalidChars);
        }

        Ok(())
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::validate(value)?;
        Ok(Identifier(value.to_string()))
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(Identifier(value))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition key for everything scoped to one conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: &str, session_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}
