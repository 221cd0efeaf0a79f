//! Configuration system for finrag.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment. Configuration
//! is loaded from `~/.config/finrag/config.toml` and/or `.finrag/config.toml`
//! in the workspace directory. Environment variables use the `FINRAG_` prefix
//! with `__` separating nested keys (e.g. `FINRAG_LLM__MODEL`); `OPENAI_MODEL`
//! is honored as an override of `llm.model`.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the answering pipeline and evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinragConfig {
    /// Documents requested per query before deduplication.
    pub top_k_retrieval: usize,
    /// Cap on the reranked set size.
    pub top_k_rerank: usize,
    /// Bypass scored reranking and use retrieval output directly.
    pub use_ground_truth_retrieval: bool,
    /// Short-circuit generation and extraction with a sentinel answer.
    pub disable_llm_generation: bool,
    pub reranker_model_name: String,
    pub embedding_model_name: String,
    /// Cap on dataset rows evaluated.
    pub evaluation_sample_limit: usize,
    pub llm: LlmConfig,
    pub reranker: RerankerConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub evaluation: EvaluationConfig,
}

impl Default for FinragConfig {
    fn default() -> Self {
        Self {
            top_k_retrieval: 10,
            top_k_rerank: 5,
            use_ground_truth_retrieval: false,
            disable_llm_generation: false,
            reranker_model_name: "rerank-english-v3.0".to_string(),
            embedding_model_name: "intfloat/e5-base-v2".to_string(),
            evaluation_sample_limit: 500,
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl FinragConfig {
    /// Validate this config and return any warnings.
    ///
    /// Returns an empty Vec if the config is sane. Problematic values are
    /// reported as human-readable warnings rather than errors.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.top_k_retrieval == 0 {
            warnings.push("top_k_retrieval is 0; retrieval will return no evidence".to_string());
        }
        if self.top_k_rerank == 0 && !self.use_ground_truth_retrieval {
            warnings.push("top_k_rerank is 0; the reranked context will be empty".to_string());
        }
        if self.top_k_rerank > self.top_k_retrieval {
            warnings.push(format!(
                "top_k_rerank ({}) exceeds top_k_retrieval ({})",
                self.top_k_rerank, self.top_k_retrieval
            ));
        }
        if self.evaluation.concurrency == 0 {
            warnings.push("evaluation.concurrency is 0; one worker will be used".to_string());
        }
        warnings.extend(self.llm.validate());
        warnings
    }
}

/// Language model configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier (e.g., "gpt-4", "gpt-4o").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum tokens to generate in a response; provider default when unset.
    pub max_tokens: Option<usize>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.0,
            top_p: 0.95,
            max_tokens: None,
            timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.temperature < 0.0 || self.temperature > 2.0 {
            warnings.push(format!(
                "llm.temperature ({}) is outside the supported range 0.0..=2.0",
                self.temperature
            ));
        }
        if self.top_p <= 0.0 || self.top_p > 1.0 {
            warnings.push(format!(
                "llm.top_p ({}) is outside the supported range (0.0, 1.0]",
                self.top_p
            ));
        }
        warnings
    }
}

/// Exponential backoff for transient provider errors (rate limits, connection drops).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Relevance scoring service (Cohere-compatible rerank API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            api_key_env: "COHERE_API_KEY".to_string(),
            base_url: "https://api.cohere.com".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Embedding endpoint (OpenAI-compatible `/embeddings`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Environment variable holding the API key; local servers need none.
    pub api_key_env: Option<String>,
    pub base_url: String,
    /// Prefix applied to queries before embedding (E5 models expect `query: `).
    pub query_prefix: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key_env: None,
            base_url: "http://localhost:8080/v1".to_string(),
            query_prefix: "query: ".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Location of the prebuilt evidence index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vector_database/evidence_index.json"),
        }
    }
}

/// Batch evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    /// Maximum number of dataset rows evaluated concurrently.
    pub concurrency: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/parsed_convfinqa.csv"),
            output_path: PathBuf::from("eval_local.csv"),
            concurrency: 4,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "finrag", "finrag")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from all layers.
///
/// `explicit` is a config file named on the command line; unlike the user and
/// workspace files it must exist.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<FinragConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(FinragConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".finrag").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(Env::raw().only(&["OPENAI_MODEL"]).map(|_| "llm.model".into()))
        .merge(Env::prefixed("FINRAG_").split("__"));

    Ok(figment.extract()?)
}

/// Check whether any finrag configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| ws.join(".finrag").join("config.toml").exists())
}

/// Resolve a required secret from the named environment variable.
pub fn require_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::EnvVarMissing {
            var: var.to_string(),
        }),
    }
}
