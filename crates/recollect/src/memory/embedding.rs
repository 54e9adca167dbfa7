//! Embedding with a guaranteed result
//!
//! Embedding failures never fail a turn. When the collaborator errors the
//! caller gets a fallback vector and a degraded warning is logged.

use std::sync::Arc;

use rand::Rng;
use tracing::warn;

use crate::config::{FallbackEmbedding, MemoryConfig};
use crate::providers::Embedder;

#[derive(Clone)]
pub struct ResilientEmbedder {
    inner: Arc<dyn Embedder>,
    fallback: FallbackEmbedding,
    fallback_dim: usize,
}

impl ResilientEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, config: &MemoryConfig) -> Self {
        Self {
            inner,
            fallback: config.fallback_embedding,
            fallback_dim: config.fallback_embedding_dim,
        }
    }

    /// Embed `text`, substituting the fallback vector on any failure
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        match self.inner.embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                let err = e.into_embedding_error();
                warn!(
                    provider = self.inner.name(),
                    "Degraded: using {:?} fallback embedding: {}", self.fallback, err
                );
                self.fallback_vector()
            }
        }
    }

    pub fn fallback_vector(&self) -> Vec<f32> {
        match self.fallback {
            FallbackEmbedding::Zero => vec![0.0; self.fallback_dim],
            FallbackEmbedding::Random => {
                let mut rng = rand::rng();
                (0..self.fallback_dim).map(|_| rng.random::<f32>()).collect()
            }
        }
    }
}
