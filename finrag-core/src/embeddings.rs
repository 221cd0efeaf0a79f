//! Query embedding for the evidence index.
//!
//! `OpenAiEmbedder` talks to any OpenAI-compatible `/embeddings` endpoint
//! (OpenAI, text-embeddings-inference, vLLM, Ollama) and is what serves the
//! configured E5 model. `LocalEmbedder` is a dependency-free hashed
//! term-frequency embedder for offline runs and tests.

use crate::config::{EmbeddingConfig, require_env};
use crate::error::{ConfigError, SearchError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a search query.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError>;

    /// Return the provider name.
    fn provider_name(&self) -> &str;
}

/// OpenAI-compatible embedding client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    query_prefix: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, model: &str) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key_env
            .as_deref()
            .map(require_env)
            .transpose()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query_prefix: config.query_prefix.clone(),
        })
    }

    /// Extract the first embedding vector from an `/embeddings` response.
    fn parse_embedding(body: &Value) -> Result<Vec<f32>, SearchError> {
        let vector = body
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| SearchError::ResponseParse {
                message: "No embedding in response".to_string(),
            })?;
        vector
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| SearchError::ResponseParse {
                    message: format!("Non-numeric embedding component: {}", v),
                })
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        let url = format!("{}/embeddings", self.base_url);
        let input = format!("{}{}", self.query_prefix, query.trim());
        debug!(url = %url, model = %self.model, "Embedding query");

        let mut request = self.client.post(&url).json(&json!({
            "model": self.model,
            "input": input,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| SearchError::Embedding {
            message: format!("Request failed: {}", e),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| SearchError::Embedding {
            message: format!("Failed to read response body: {}", e),
        })?;
        if !status.is_success() {
            return Err(SearchError::Embedding {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| SearchError::ResponseParse {
            message: format!("Invalid JSON: {}", e),
        })?;
        Self::parse_embedding(&json)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Local hashed term-frequency embedder (no external dependencies).
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed arbitrary text; the same algorithm is used for queries and passages.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            *tf.entry(word).or_insert(0) += 1;
        }

        for (term, count) in &tf {
            let idx = simple_hash(term) % self.dimensions;
            vector[idx] += *count as f32;
        }

        // L2 normalize
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// djb2 string hash.
fn simple_hash(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        Ok(self.embed_text(query))
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}
