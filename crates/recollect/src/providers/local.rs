//! In-process embedding with fastembed
//!
//! Runs multilingual-e5-small (384 dims) on a blocking thread. The model is
//! downloaded on first use.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};

use crate::config::EmbeddingConfig;
use crate::providers::Embedder;
use crate::providers::types::ProviderError;

pub const LOCAL_EMBEDDING_DIMENSION: usize = 384;

pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    timeout: Duration,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let model = TextEmbedding::try_new(InitOptions::new(FastEmbedModel::MultilingualE5Small))
            .map_err(|e| ProviderError::Config(format!("Failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let model = Arc::clone(&self.model);
        let input = vec![text.to_string()];

        let task = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| {
                    ProviderError::Unavailable("Embedding model lock poisoned".to_string())
                })?;
            model
                .embed(input, None)
                .map_err(|e| ProviderError::Unavailable(e.to_string()))
        });

        let embeddings = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| ProviderError::Unavailable("Embedding timed out".to_string()))?
            .map_err(|e| ProviderError::Unavailable(format!("Embedding task failed: {e}")))??;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No embedding returned".to_string()))
    }

    fn name(&self) -> &'static str {
        "fastembed"
    }
}
