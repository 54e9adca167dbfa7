//! Memory types for the Recollect engine
//!
//! Defines the three record kinds the engine persists: ledger turns,
//! episodic facts and digests. All of them are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a persisted turn
pub type TurnId = Uuid;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Convert role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse the stored representation back into a role
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub user_id: String,
    pub session_id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(user_id: &str, session_id: &str, role: Role, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    /// `role: text`, the line format used in prompts
    pub fn render(&self) -> String {
        format!("{}: {}", self.role, self.text)
    }
}

/// An atomic fact extracted from a user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub fact: String,
    /// Importance in [0, 1]
    pub importance: f32,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Episode {
    pub fn new(
        user_id: &str,
        session_id: &str,
        fact: String,
        importance: f32,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            fact,
            importance: importance.clamp(0.0, 1.0),
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// An episode paired with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEpisode {
    pub episode: Episode,
    pub similarity: f32,
}

/// Digest granularity without the session payload, used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    Session,
    Lifetime,
}

impl DigestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestKind::Session => "session",
            DigestKind::Lifetime => "lifetime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "session" => Some(DigestKind::Session),
            "lifetime" => Some(DigestKind::Lifetime),
            _ => None,
        }
    }
}

/// Scope of a digest. A session digest always names its session and a
/// lifetime digest never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum DigestScope {
    Session { session_id: String },
    Lifetime,
}

impl DigestScope {
    pub fn session(session_id: &str) -> Self {
        DigestScope::Session {
            session_id: session_id.to_string(),
        }
    }

    pub fn kind(&self) -> DigestKind {
        match self {
            DigestScope::Session { .. } => DigestKind::Session,
            DigestScope::Lifetime => DigestKind::Lifetime,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            DigestScope::Session { session_id } => Some(session_id),
            DigestScope::Lifetime => None,
        }
    }
}

/// A generated summary snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub id: Uuid,
    pub user_id: String,
    #[serde(flatten)]
    pub scope: DigestScope,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Digest {
    pub fn new(user_id: &str, scope: DigestScope, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            scope,
            text,
            created_at: Utc::now(),
        }
    }
}

/// Number of turns recorded on one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: usize,
}
