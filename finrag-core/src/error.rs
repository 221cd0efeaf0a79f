//! Error types for finrag core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the language model, the evidence index, the reranker, and
//! configuration.

use std::path::PathBuf;

/// Top-level error type for the finrag core library.
#[derive(Debug, thiserror::Error)]
pub enum FinragError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Rerank error: {0}")]
    Rerank(#[from] RerankError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from language model interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the evidence index and the embedding endpoint behind it.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Failed to load index {path}: {message}")]
    IndexLoad { path: PathBuf, message: String },

    #[error("Embedding request failed: {message}")]
    Embedding { message: String },

    #[error("Embedding response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from the relevance scoring service.
#[derive(Debug, thiserror::Error)]
pub enum RerankError {
    #[error("Rerank request failed: {message}")]
    ApiRequest { message: String },

    #[error("Rerank response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Rerank result index {index} out of range for {len} candidates")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `FinragError`.
pub type Result<T> = std::result::Result<T, FinragError>;
