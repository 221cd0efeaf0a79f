//! External services the pipeline depends on.
//!
//! Clients are built once and shared behind `Arc`, so one set of services can
//! serve many pipeline runs concurrently.

use crate::error::RagError;
use finrag_core::brain::LlmProvider;
use finrag_core::config::FinragConfig;
use finrag_core::embeddings::{Embedder, OpenAiEmbedder};
use finrag_core::providers::create_provider;
use finrag_core::rerank::{CohereReranker, RelevanceScorer};
use finrag_core::search::{EvidenceIndex, SimilaritySearch};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PipelineServices {
    pub llm: Arc<dyn LlmProvider>,
    pub search: Arc<dyn SimilaritySearch>,
    /// Absent when reranking is bypassed in favor of retrieval order.
    pub scorer: Option<Arc<dyn RelevanceScorer>>,
}

impl PipelineServices {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SimilaritySearch>,
        scorer: Option<Arc<dyn RelevanceScorer>>,
    ) -> Self {
        Self { llm, search, scorer }
    }

    /// Build the real clients and load the evidence index.
    ///
    /// Fails with a configuration error when a required credential is absent.
    /// The rerank credential is only required when scored reranking is enabled.
    pub async fn from_config(config: &FinragConfig) -> Result<Self, RagError> {
        let llm = create_provider(&config.llm)?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
            &config.embedding,
            &config.embedding_model_name,
        )?);
        let index = EvidenceIndex::load(&config.index.path, embedder).await?;

        let scorer: Option<Arc<dyn RelevanceScorer>> = if config.use_ground_truth_retrieval {
            None
        } else {
            Some(Arc::new(CohereReranker::new(
                &config.reranker,
                &config.reranker_model_name,
            )?))
        };

        info!(
            model = llm.model_name(),
            index_size = index.len(),
            reranker = scorer.as_ref().map(|_| config.reranker_model_name.as_str()),
            "Pipeline services ready"
        );
        Ok(Self::new(llm, Arc::new(index), scorer))
    }
}
