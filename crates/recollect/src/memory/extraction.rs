//! Episodic fact extraction from user messages
//!
//! A user message is split into sentence-like candidates on `.`. Each
//! candidate that passes the length gate gets a keyword importance score and
//! only candidates scoring above the threshold become episodes.

use std::sync::Arc;

use tracing::debug;

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::memory::embedding::ResilientEmbedder;
use crate::memory::types::Episode;
use crate::storage::MemoryStore;

/// Keywords marking a strongly held or explicitly flagged fact
const STRONG_KEYWORDS: &[&str] = &["important", "remember", "always", "never", "love", "hate"];

/// Keywords marking a preference
const PREFERENCE_KEYWORDS: &[&str] = &["like", "prefer", "want", "need"];

const STRONG_IMPORTANCE: f32 = 0.8;
const PREFERENCE_IMPORTANCE: f32 = 0.6;
const BASE_IMPORTANCE: f32 = 0.5;

/// A fact that passed both gates, before embedding
#[derive(Debug, Clone, PartialEq)]
pub struct FactCandidate {
    pub fact: String,
    pub importance: f32,
}

/// Importance of one fact. First matching bucket wins; matching is a
/// case-insensitive substring test, so "likely" counts as "like".
pub fn score_importance(fact: &str) -> f32 {
    let lowered = fact.to_lowercase();

    if STRONG_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        STRONG_IMPORTANCE
    } else if PREFERENCE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        PREFERENCE_IMPORTANCE
    } else {
        BASE_IMPORTANCE
    }
}

/// Length gate and importance gate settings
#[derive(Debug, Clone, Copy)]
pub struct ExtractionPolicy {
    /// Exclusive lower bound on trimmed char count
    pub min_chars: usize,
    /// Exclusive upper bound on trimmed char count
    pub max_chars: usize,
    /// Exclusive lower bound on importance
    pub importance_threshold: f32,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for ExtractionPolicy {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            min_chars: config.min_fact_chars,
            max_chars: config.max_fact_chars,
            importance_threshold: config.importance_threshold,
        }
    }
}

impl ExtractionPolicy {
    /// Candidates from `text` that pass both gates, in message order
    pub fn candidates(&self, text: &str) -> Vec<FactCandidate> {
        text.split('.')
            .map(str::trim)
            .filter(|s| {
                let len = s.chars().count();
                len > self.min_chars && len < self.max_chars
            })
            .map(|s| FactCandidate {
                fact: s.to_string(),
                importance: score_importance(s),
            })
            .filter(|c| c.importance > self.importance_threshold)
            .collect()
    }
}

/// Turns user messages into persisted episodes
#[derive(Clone)]
pub struct EpisodeExtractor {
    store: Arc<dyn MemoryStore>,
    embedder: ResilientEmbedder,
    policy: ExtractionPolicy,
}

impl EpisodeExtractor {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: ResilientEmbedder,
        policy: ExtractionPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            policy,
        }
    }

    /// Extract, embed and persist the facts in `text`. Returns what was stored.
    pub async fn extract(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<Vec<Episode>> {
        let candidates = self.policy.candidates(text);
        debug!("{} fact candidates passed extraction gates", candidates.len());

        let mut episodes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let embedding = self.embedder.embed(&candidate.fact).await;
            let episode = Episode::new(
                user_id,
                session_id,
                candidate.fact,
                candidate.importance,
                embedding,
            );
            self.store.append_episode(&episode).await?;
            episodes.push(episode);
        }

        Ok(episodes)
    }
}
