//! Text generation through any OpenAI-compatible `/chat/completions` endpoint

use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::config::GenerationConfig;
use crate::providers::TextGenerator;
use crate::providers::http::{JsonClient, endpoint};
use crate::providers::types::ProviderError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Sends the whole composite prompt as a single user message
#[derive(Debug)]
pub struct OpenAiGenerator {
    http: JsonClient,
    url: Url,
    model: String,
}

impl OpenAiGenerator {
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`.
    pub fn new(config: &GenerationConfig) -> Result<Self, ProviderError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            ProviderError::Config(format!(
                "API key env var '{}' not set",
                config.api_key_env
            ))
        })?;

        let http =
            JsonClient::new(config.timeout_secs, config.max_retries)?.with_bearer_token(api_key);

        info!(
            "OpenAI-compatible generator initialized with model: {}, base_url: {}",
            config.model, config.base_url
        );

        Ok(Self {
            http,
            url: endpoint(&config.base_url, "chat/completions")?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let completion: ChatCompletionResponse = self.http.post_json(&self.url, &request).await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("Empty response".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
