//! Similarity search over the prebuilt evidence index.
//!
//! The index is a JSON array of records, each carrying the document id, its
//! table (markdown), its narrative context, and a precomputed passage
//! embedding. Building the index happens elsewhere; this module only loads
//! and queries it.

use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::types::Evidence;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Marker that prefixes every evidence payload.
pub const PASSAGE_MARKER: &str = "passage:";

/// Similarity search service.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `k` evidence items most similar to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Evidence>, SearchError>;
}

/// One record of the on-disk index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    #[serde(default)]
    pub table_markdown: String,
    #[serde(default)]
    pub context: String,
    pub embedding: Vec<f32>,
}

impl IndexRecord {
    /// Render the record as evidence text: `passage: {table}\n\n{context}`.
    pub fn to_evidence(&self) -> Evidence {
        let content = format!(
            "{} {}\n\n{}",
            PASSAGE_MARKER, self.table_markdown, self.context
        );
        Evidence::new(self.id.clone(), content.trim())
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// In-memory evidence index with brute-force cosine search.
///
/// Read-only after loading; safe to share across concurrent pipeline runs.
pub struct EvidenceIndex {
    records: Vec<IndexRecord>,
    dimensions: usize,
    embedder: Arc<dyn Embedder>,
}

impl EvidenceIndex {
    pub fn new(records: Vec<IndexRecord>, embedder: Arc<dyn Embedder>) -> Result<Self, SearchError> {
        let dimensions = records.first().map(|r| r.embedding.len()).unwrap_or(0);
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimensions) {
            return Err(SearchError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self {
            records,
            dimensions,
            embedder,
        })
    }

    /// Load the index from a JSON file.
    pub async fn load(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, SearchError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SearchError::IndexLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let records: Vec<IndexRecord> =
            serde_json::from_str(&raw).map_err(|e| SearchError::IndexLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let index = Self::new(records, embedder)?;
        info!(
            path = %path.display(),
            records = index.len(),
            dimensions = index.dimensions,
            embedder = index.embedder.provider_name(),
            "Loaded evidence index"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn rank(&self, query_embedding: &[f32], k: usize) -> Vec<Evidence> {
        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(query_embedding, &r.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.records[i].to_evidence())
            .collect()
    }
}

#[async_trait]
impl SimilaritySearch for EvidenceIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Evidence>, SearchError> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed_query(query).await?;
        if embedding.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        let results = self.rank(&embedding, k);
        debug!(query = %query, k, returned = results.len(), "Similarity search");
        Ok(results)
    }
}

/// A scripted search service for tests.
///
/// Maps exact query strings to result lists; unknown queries return nothing.
/// Per-query delays make concurrent completion order controllable.
#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<Evidence>>,
    delays: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<Evidence>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Make searches for `query` fail with an embedding error.
    pub fn with_failure(mut self, query: &str, message: &str) -> Self {
        self.failures.insert(query.to_string(), message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilaritySearch for MockSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Evidence>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(query) {
            return Err(SearchError::Embedding {
                message: message.clone(),
            });
        }
        Ok(self
            .results
            .get(query)
            .map(|r| r.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }
}
