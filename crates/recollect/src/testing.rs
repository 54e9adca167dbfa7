//! Test utilities for recollect - deterministic collaborators
//!
//! These stand in for the text-generation and embedding providers so the
//! engine can be exercised without a model server.

use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::providers::{Embedder, ProviderError, TextGenerator};

/// Dimension of [`HashEmbedder`] vectors
pub const HASH_EMBEDDING_DIM: usize = 256;

/// Bag-of-words embedder. Each lowercased word (punctuation stripped) adds 1.0
/// to a hashed bucket, so texts sharing words are cosine-similar.
#[derive(Debug, Clone, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn new() -> Self {
        Self
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; HASH_EMBEDDING_DIM];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() % HASH_EMBEDDING_DIM as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.vector(text))
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

/// Embedder that always fails as if the server were down
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder;

impl FailingEmbedder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Generator replying from a script and recording every prompt it receives.
/// Once the script runs out the last reply repeats.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new("ok".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| ProviderError::Unavailable("script lock poisoned".to_string()))?;
        if let Some(reply) = next {
            *last = reply;
        }
        Ok(last.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Generator that always fails in a chosen way
#[derive(Debug, Clone, Copy)]
pub enum FailingGenerator {
    Unavailable,
    Rejected(u16),
}

impl FailingGenerator {
    pub fn unavailable() -> Self {
        FailingGenerator::Unavailable
    }

    pub fn rejected(status: u16) -> Self {
        FailingGenerator::Rejected(status)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        match *self {
            FailingGenerator::Unavailable => {
                Err(ProviderError::Unavailable("timed out".to_string()))
            }
            FailingGenerator::Rejected(status) => Err(ProviderError::Rejected {
                status,
                body: "rejected".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
