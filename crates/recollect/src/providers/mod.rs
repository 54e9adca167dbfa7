//! Collaborators for text generation and embedding
//!
//! The engine only sees the [`TextGenerator`] and [`Embedder`] traits.
//! Concrete providers are picked from configuration at startup.

pub mod http;
pub mod local;
pub mod ollama;
pub mod openai;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingConfig, EmbeddingProvider, GenerationConfig, GenerationProvider};

pub use local::LocalEmbedder;
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use openai::OpenAiGenerator;
pub use types::ProviderError;

/// Produces reply and digest text from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Maps text to a dense vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    let generator: Arc<dyn TextGenerator> = match config.provider {
        GenerationProvider::Ollama => Arc::new(OllamaGenerator::new(config)?),
        GenerationProvider::OpenAi => Arc::new(OpenAiGenerator::new(config)?),
    };
    tracing::info!(
        "Text generation via {} (model: {})",
        generator.name(),
        config.model
    );
    Ok(generator)
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(config)?),
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::new(config)?),
    };
    tracing::info!("Embedding via {}", embedder.name());
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_generator_is_ollama() {
        let generator = build_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.name(), "ollama");
    }

    #[test]
    fn test_build_default_embedder_is_ollama() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.name(), "ollama");
    }

    #[test]
    fn test_build_rejects_invalid_url() {
        let config = GenerationConfig {
            base_url: "::nope::".to_string(),
            ..GenerationConfig::default()
        };
        assert!(matches!(
            build_generator(&config),
            Err(ProviderError::Config(_))
        ));
    }
}
