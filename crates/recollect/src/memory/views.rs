//! Read-only projections handed to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::types::{DailyCount, Digest, DigestKind, Episode, Role, ScoredEpisode, Turn};

/// Length of digest previews in the aggregate view, in chars
pub const PREVIEW_CHARS: usize = 100;

/// Reply plus what memory fed into it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub reply: String,
    pub memory: MemorySnapshot,
}

/// Memory read for one turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Turns in the short-term window, the current user turn included
    pub short_term_count: usize,
    pub session_digest: Option<String>,
    pub lifetime_digest: Option<String>,
    pub episodic_facts: Vec<FactView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactView {
    pub fact: String,
    pub importance: f32,
    pub similarity: f32,
}

impl From<&ScoredEpisode> for FactView {
    fn from(scored: &ScoredEpisode) -> Self {
        Self {
            fact: scored.episode.fact.clone(),
            importance: scored.episode.importance,
            similarity: scored.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Turn> for TurnView {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            text: turn.text,
            created_at: turn.created_at,
        }
    }
}

/// An episode without its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeView {
    pub fact: String,
    pub importance: f32,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Episode> for EpisodeView {
    fn from(episode: Episode) -> Self {
        Self {
            fact: episode.fact,
            importance: episode.importance,
            session_id: episode.session_id,
            created_at: episode.created_at,
        }
    }
}

/// State of a user's most recent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryView {
    pub user_id: String,
    pub session_id: String,
    pub short_term: Vec<TurnView>,
    pub session_digest: Option<String>,
    pub lifetime_digest: Option<String>,
    pub recent_episodes: Vec<EpisodeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestPreview {
    pub scope: DigestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

impl From<Digest> for DigestPreview {
    fn from(digest: Digest) -> Self {
        Self {
            scope: digest.scope.kind(),
            session_id: digest.scope.session_id().map(str::to_string),
            preview: preview(&digest.text, PREVIEW_CHARS),
            created_at: digest.created_at,
        }
    }
}

/// Activity rollup across all sessions of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateView {
    pub user_id: String,
    pub daily_turn_counts: Vec<DailyCount>,
    pub recent_digests: Vec<DigestPreview>,
    pub recent_episodes: Vec<EpisodeView>,
}

/// First `max_chars` chars of `text` followed by `...`, or `text` unchanged
/// when it already fits
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
