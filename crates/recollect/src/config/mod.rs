use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{RecollectError, Result};

/// Main configuration structure for Recollect
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Memory engine tuning (windows, triggers, extraction gates)
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Text generation collaborator
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Embedding collaborator
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, falling back to built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".recollect").join("config.toml")),
            dirs::config_dir().map(|c| c.join("recollect").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecollectError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| RecollectError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Which document store backs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// LanceDB tables on local disk
    #[default]
    Lance,
    /// Process-local, lost on shutdown
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Base directory for LanceDB tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".recollect"))
        .unwrap_or_else(|| PathBuf::from(".recollect"))
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8000")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Upper bound for a whole request, generation included. Keep it above
    /// [`GenerationConfig::retry_budget_secs`] or retries get cut short.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    420
}

/// What to store when the embedding collaborator fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackEmbedding {
    /// Uniform random components in [0, 1)
    #[default]
    Random,
    /// All zeros; similarity against it is always 0.0
    Zero,
}

/// Memory engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Number of turns in the short-term window
    #[serde(default = "default_short_term_window")]
    pub short_term_window: usize,
    /// Session digest is written every N user turns
    #[serde(default = "default_summarize_every_user_msgs")]
    pub summarize_every_user_msgs: usize,
    /// Lifetime digest is written when the short-term window length is a multiple of this
    #[serde(default = "default_lifetime_gate_modulo")]
    pub lifetime_gate_modulo: usize,
    /// Episodic facts surfaced per turn
    #[serde(default = "default_top_k_episodes")]
    pub top_k_episodes: usize,
    /// Turns fed to the session summarizer
    #[serde(default = "default_session_digest_turns")]
    pub session_digest_turns: usize,
    /// Session digests fed to the lifetime summarizer
    #[serde(default = "default_lifetime_digest_sources")]
    pub lifetime_digest_sources: usize,
    /// Candidate facts must be strictly longer than this (chars)
    #[serde(default = "default_min_fact_chars")]
    pub min_fact_chars: usize,
    /// Candidate facts must be strictly shorter than this (chars)
    #[serde(default = "default_max_fact_chars")]
    pub max_fact_chars: usize,
    /// Facts are persisted only above this importance
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: f32,
    #[serde(default)]
    pub fallback_embedding: FallbackEmbedding,
    /// Dimension of the fallback vector
    #[serde(default = "default_fallback_embedding_dim")]
    pub fallback_embedding_dim: usize,
    /// Run summarization after the reply has been handed back
    #[serde(default = "default_defer_summaries")]
    pub defer_summaries: bool,
    /// First section of every generation prompt
    #[serde(default = "default_system_primer")]
    pub system_primer: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_window: default_short_term_window(),
            summarize_every_user_msgs: default_summarize_every_user_msgs(),
            lifetime_gate_modulo: default_lifetime_gate_modulo(),
            top_k_episodes: default_top_k_episodes(),
            session_digest_turns: default_session_digest_turns(),
            lifetime_digest_sources: default_lifetime_digest_sources(),
            min_fact_chars: default_min_fact_chars(),
            max_fact_chars: default_max_fact_chars(),
            importance_threshold: default_importance_threshold(),
            fallback_embedding: FallbackEmbedding::default(),
            fallback_embedding_dim: default_fallback_embedding_dim(),
            defer_summaries: default_defer_summaries(),
            system_primer: default_system_primer(),
        }
    }
}

fn default_short_term_window() -> usize {
    16
}

fn default_summarize_every_user_msgs() -> usize {
    5
}

fn default_lifetime_gate_modulo() -> usize {
    5
}

fn default_top_k_episodes() -> usize {
    5
}

fn default_session_digest_turns() -> usize {
    20
}

fn default_lifetime_digest_sources() -> usize {
    5
}

fn default_min_fact_chars() -> usize {
    10
}

fn default_max_fact_chars() -> usize {
    200
}

fn default_importance_threshold() -> f32 {
    0.4
}

fn default_fallback_embedding_dim() -> usize {
    384
}

fn default_defer_summaries() -> bool {
    true
}

fn default_system_primer() -> String {
    "You are a helpful AI assistant with memory. Use the provided context and facts to give personalized responses.".to_string()
}

/// Text generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Ollama `/api/generate`
    #[default]
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
}

/// Text generation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,
    /// API base URL
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Environment variable holding the API key (OpenAI-compatible only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries on network errors and rate limiting
    #[serde(default = "default_generation_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            base_url: default_ollama_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout_secs(),
            max_retries: default_generation_max_retries(),
        }
    }
}

impl GenerationConfig {
    /// Worst-case seconds one generation call can take: every attempt timing
    /// out plus the doubling backoff (1s, 2s, ...) between attempts
    pub fn retry_budget_secs(&self) -> u64 {
        let attempts = self.max_retries.max(1);
        let backoff = (1u64 << (attempts - 1).min(32)) - 1;
        self.timeout_secs
            .saturating_mul(u64::from(attempts))
            .saturating_add(backoff)
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_generation_model() -> String {
    "phi3:mini".to_string()
}

fn default_api_key_env() -> String {
    "RECOLLECT_API_KEY".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_generation_max_retries() -> u32 {
    3
}

/// Embedding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Ollama `/api/embeddings`
    #[default]
    Ollama,
    /// In-process fastembed model (multilingual-e5-small, 384 dims)
    Local,
}

/// Embedding configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    /// API base URL (Ollama only)
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name (Ollama only)
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_embedding_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            base_url: default_ollama_url(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: default_embedding_max_retries(),
        }
    }
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    60
}

fn default_embedding_max_retries() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Lance);
        assert_eq!(config.server.listen_addr, "127.0.0.1:8000");
        assert_eq!(config.server.request_timeout_secs, 420);
        assert_eq!(config.memory.short_term_window, 16);
        assert_eq!(config.memory.summarize_every_user_msgs, 5);
        assert_eq!(config.memory.lifetime_gate_modulo, 5);
        assert_eq!(config.memory.top_k_episodes, 5);
        assert_eq!(config.memory.session_digest_turns, 20);
        assert_eq!(config.memory.lifetime_digest_sources, 5);
        assert_eq!(config.memory.min_fact_chars, 10);
        assert_eq!(config.memory.max_fact_chars, 200);
        assert!((config.memory.importance_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.memory.fallback_embedding, FallbackEmbedding::Random);
        assert_eq!(config.memory.fallback_embedding_dim, 384);
        assert!(config.memory.defer_summaries);
        assert_eq!(config.generation.provider, GenerationProvider::Ollama);
        assert_eq!(config.generation.model, "phi3:mini");
        assert_eq!(config.generation.timeout_secs, 120);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.timeout_secs, 60);
    }

    #[test]
    fn test_request_timeout_covers_generation_retries() {
        let config = Config::default();
        // 3 attempts of 120s plus 1s and 2s of backoff
        assert_eq!(config.generation.retry_budget_secs(), 363);
        assert!(config.server.request_timeout_secs > config.generation.retry_budget_secs());
    }

    #[test]
    fn test_retry_budget_single_attempt() {
        let generation = GenerationConfig {
            timeout_secs: 30,
            max_retries: 0,
            ..GenerationConfig::default()
        };
        assert_eq!(generation.retry_budget_secs(), 30);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[storage]
backend = "memory"
data_dir = "/tmp/recollect"

[server]
listen_addr = "0.0.0.0:9000"

[memory]
short_term_window = 8
summarize_every_user_msgs = 3
fallback_embedding = "zero"
defer_summaries = false

[generation]
provider = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[embedding]
provider = "local"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/recollect"));
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.memory.short_term_window, 8);
        assert_eq!(config.memory.summarize_every_user_msgs, 3);
        assert_eq!(config.memory.fallback_embedding, FallbackEmbedding::Zero);
        assert!(!config.memory.defer_summaries);
        assert_eq!(config.generation.provider, GenerationProvider::OpenAi);
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.generation.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.embedding.provider, EmbeddingProvider::Local);
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[memory]
top_k_episodes = 3
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.memory.top_k_episodes, 3);
        assert_eq!(config.memory.short_term_window, 16);
        assert_eq!(config.generation.base_url, "http://localhost:11434");
        assert_eq!(config.embedding.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let toml_str = r#"
[generation]
provider = "carrier-pigeon"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[memory]\nshort_term_window = 4\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.memory.short_term_window, 4);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/recollect.toml")));
        assert!(matches!(result, Err(RecollectError::Config(_))));
    }
}
