//! Ollama HTTP providers
//!
//! `POST /api/generate` with `stream: false` for text, `POST /api/embeddings`
//! for vectors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::providers::http::{JsonClient, endpoint};
use crate::providers::types::ProviderError;
use crate::providers::{Embedder, TextGenerator};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug)]
pub struct OllamaGenerator {
    http: JsonClient,
    url: Url,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: JsonClient::new(config.timeout_secs, config.max_retries)?,
            url: endpoint(&config.base_url, "api/generate")?,
            model: config.model.clone(),
        })
    }

    #[cfg(test)]
    fn with_client(mut self, http: JsonClient) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = self.http.post_json(&self.url, &request).await?;
        Ok(response.response)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[derive(Debug)]
pub struct OllamaEmbedder {
    http: JsonClient,
    url: Url,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: JsonClient::new(config.timeout_secs, config.max_retries)?,
            url: endpoint(&config.base_url, "api/embeddings")?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbeddingsResponse = self.http.post_json(&self.url, &request).await?;
        if response.embedding.is_empty() {
            return Err(ProviderError::Parse("Empty embedding returned".to_string()));
        }
        Ok(response.embedding)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
