//! Filter types for ledger and digest scans
//!
//! Each filter can render itself as a LanceDB SQL predicate and can also be
//! evaluated directly against a record, so every backend applies the same
//! semantics.

use crate::memory::types::{Digest, DigestKind, Role, Turn};

/// Quote a string literal for a SQL predicate
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Filter criteria for turn scans. Multiple fields combine with AND.
#[derive(Debug, Clone)]
pub struct TurnFilter {
    pub user_id: String,
    /// Restrict to one session
    pub session_id: Option<String>,
    /// Restrict to one speaker
    pub role: Option<Role>,
}

impl TurnFilter {
    /// All turns of a user, across sessions
    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: None,
            role: None,
        }
    }

    /// All turns of one session
    pub fn session(user_id: &str, session_id: &str) -> Self {
        Self::user(user_id).with_session(session_id)
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn to_sql_clause(&self) -> String {
        let mut conditions = vec![format!("user_id = {}", sql_literal(&self.user_id))];

        if let Some(ref session_id) = self.session_id {
            conditions.push(format!("session_id = {}", sql_literal(session_id)));
        }

        if let Some(role) = self.role {
            conditions.push(format!("role = '{}'", role.as_str()));
        }

        conditions.join(" AND ")
    }

    pub fn matches(&self, turn: &Turn) -> bool {
        turn.user_id == self.user_id
            && self
                .session_id
                .as_ref()
                .is_none_or(|s| *s == turn.session_id)
            && self.role.is_none_or(|r| r == turn.role)
    }
}

/// Filter criteria for digest scans
#[derive(Debug, Clone)]
pub struct DigestFilter {
    pub user_id: String,
    pub kind: Option<DigestKind>,
    pub session_id: Option<String>,
}

impl DigestFilter {
    /// Every digest of a user, both scopes
    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: None,
            session_id: None,
        }
    }

    /// Session digests of a user; optionally narrowed to one session
    pub fn sessions(user_id: &str, session_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: Some(DigestKind::Session),
            session_id: session_id.map(str::to_string),
        }
    }

    /// Lifetime digests of a user
    pub fn lifetime(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: Some(DigestKind::Lifetime),
            session_id: None,
        }
    }

    pub fn to_sql_clause(&self) -> String {
        let mut conditions = vec![format!("user_id = {}", sql_literal(&self.user_id))];

        if let Some(kind) = self.kind {
            conditions.push(format!("scope = '{}'", kind.as_str()));
        }

        if let Some(ref session_id) = self.session_id {
            conditions.push(format!("session_id = {}", sql_literal(session_id)));
        }

        conditions.join(" AND ")
    }

    pub fn matches(&self, digest: &Digest) -> bool {
        digest.user_id == self.user_id
            && self.kind.is_none_or(|k| k == digest.scope.kind())
            && self
                .session_id
                .as_deref()
                .is_none_or(|s| Some(s) == digest.scope.session_id())
    }
}
