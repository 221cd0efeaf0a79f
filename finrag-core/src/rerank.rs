//! Relevance scoring service.
//!
//! The reranker receives the question and the candidate evidence texts and
//! returns indices into the candidate list, most relevant first.
//! `CohereReranker` speaks the Cohere `/v1/rerank` API (also served by
//! compatible self-hosted rerankers).

use crate::config::{RerankerConfig, require_env};
use crate::error::{ConfigError, RerankError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// One document submitted for relevance scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankCandidate {
    pub identity: String,
    pub text: String,
}

/// Relevance scoring service.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Return indices into `candidates`, most relevant first, at most `top_n` of them.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        top_n: usize,
    ) -> Result<Vec<usize>, RerankError>;
}

/// Cohere-compatible rerank client.
pub struct CohereReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereReranker {
    pub fn new(config: &RerankerConfig, model: &str) -> Result<Self, ConfigError> {
        let api_key = require_env(&config.api_key_env)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Documents go out as `{text, id}` objects; only `text` is scored.
    fn request_body(&self, query: &str, candidates: &[RerankCandidate], top_n: usize) -> Value {
        let documents: Vec<Value> = candidates
            .iter()
            .map(|c| json!({ "text": c.text, "id": c.identity }))
            .collect();
        json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "rank_fields": ["text"],
            "top_n": top_n,
            "return_documents": false,
        })
    }

    /// Read `results[].index` and check each index against the candidate count.
    fn parse_indices(body: &Value, len: usize) -> Result<Vec<usize>, RerankError> {
        let results = body
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| RerankError::ResponseParse {
                message: "No results in response".to_string(),
            })?;
        results
            .iter()
            .map(|r| {
                let index = r.get("index").and_then(|i| i.as_u64()).ok_or_else(|| {
                    RerankError::ResponseParse {
                        message: format!("Result without index: {}", r),
                    }
                })? as usize;
                if index >= len {
                    return Err(RerankError::IndexOutOfRange { index, len });
                }
                Ok(index)
            })
            .collect()
    }
}

#[async_trait]
impl RelevanceScorer for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        top_n: usize,
    ) -> Result<Vec<usize>, RerankError> {
        let url = format!("{}/v1/rerank", self.base_url);
        debug!(url = %url, model = %self.model, candidates = candidates.len(), top_n, "Sending rerank request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(query, candidates, top_n))
            .send()
            .await
            .map_err(|e| RerankError::ApiRequest {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RerankError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;
        if !status.is_success() {
            return Err(RerankError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| RerankError::ResponseParse {
            message: format!("Invalid JSON: {}", e),
        })?;
        Self::parse_indices(&json, candidates.len())
    }
}

/// A scripted reranker for tests.
///
/// Returns a fixed ranking (filtered to valid indices) or, when none is set,
/// the candidates in reverse order. Records the `top_n` of every call.
#[derive(Default)]
pub struct MockReranker {
    ranking: Option<Vec<usize>>,
    calls: Mutex<Vec<usize>>,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranking(ranking: Vec<usize>) -> Self {
        Self {
            ranking: Some(ranking),
            ..Self::default()
        }
    }

    /// `top_n` values requested so far, one per call.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RelevanceScorer for MockReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: &[RerankCandidate],
        top_n: usize,
    ) -> Result<Vec<usize>, RerankError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(top_n);
        }
        let order: Vec<usize> = match &self.ranking {
            Some(ranking) => ranking
                .iter()
                .copied()
                .filter(|i| *i < candidates.len())
                .collect(),
            None => (0..candidates.len()).rev().collect(),
        };
        Ok(order.into_iter().take(top_n).collect())
    }
}
