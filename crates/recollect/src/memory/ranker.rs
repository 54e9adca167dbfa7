//! Relevance ranking of episodic facts against a query embedding

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::memory::types::ScoredEpisode;
use crate::storage::MemoryStore;

/// Picks the episodes most relevant to a query vector
#[async_trait]
pub trait RelevanceRanker: Send + Sync {
    /// At most `top_k` episodes of `user_id`, by descending similarity
    async fn rank(&self, user_id: &str, query: &[f32], top_k: usize) -> Result<Vec<ScoredEpisode>>;
}

/// Scores every episode of the user. Ties keep chronological scan order.
pub struct LinearRanker {
    store: Arc<dyn MemoryStore>,
}

impl LinearRanker {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RelevanceRanker for LinearRanker {
    async fn rank(&self, user_id: &str, query: &[f32], top_k: usize) -> Result<Vec<ScoredEpisode>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let episodes = self.store.episodes_for_user(user_id).await?;

        let mut scored: Vec<ScoredEpisode> = episodes
            .into_iter()
            .map(|episode| {
                let similarity = cosine_similarity(query, &episode.embedding);
                ScoredEpisode {
                    episode,
                    similarity,
                }
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(top_k);

        Ok(scored)
    }
}

/// Cosine similarity; 0.0 for empty, zero-norm or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 || !dot.is_finite() {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
