//! Configuration loading, validation, and management for papertalk.
//!
//! Loads configuration from a TOML file with `PAPERTALK_*` environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model used by the dispatch loop and the SQL tool
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model used for document and query vectors
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Sampling temperature for chat completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retrieval pipeline settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Dispatch loop limits
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Path to the conversation checkpoint database
    #[serde(default = "default_history_db")]
    pub history_db: String,

    /// Path to the demo company database used by the SQL tool
    #[serde(default = "default_company_db")]
    pub company_db: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_history_db() -> String {
    "chatbot.db".into()
}
fn default_company_db() -> String {
    "company.db".into()
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retrieval", &self.retrieval)
            .field("runtime", &self.runtime)
            .field("history_db", &self.history_db)
            .field("company_db", &self.company_db)
            .finish()
    }
}

/// Retrieval pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Default number of chunks returned per retrieval query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// Dispatch loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum model round-trips per conversation turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Timeout for a single model call, in seconds
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    /// Timeout for a single tool call, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_model_timeout() -> u64 {
    120
}
fn default_tool_timeout() -> u64 {
    60
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            model_timeout_secs: default_model_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retrieval: RetrievalConfig::default(),
            runtime: RuntimeConfig::default(),
            history_db: default_history_db(),
            company_db: default_company_db(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, apply environment overrides,
    /// and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&text)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for setups without a file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("PAPERTALK_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("PAPERTALK_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(model) = std::env::var("PAPERTALK_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Ok(model) = std::env::var("PAPERTALK_EMBEDDING_MODEL") {
            self.embedding_model = model;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(ConfigError::Invalid(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be positive".into()));
        }
        if self.runtime.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be positive".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}
