//! The answering pipeline: a fixed sequence of stages over [`PipelineState`].

use super::extract::AnswerExtractor;
use super::filter::ContextFilter;
use super::generate::AnswerGenerator;
use super::query::QueryExpander;
use super::reranker::Reranker;
use super::retriever::Retriever;
use super::state::PipelineState;
use crate::error::RagError;
use crate::services::PipelineServices;
use finrag_core::config::FinragConfig;
use finrag_core::types::Message;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Runs one question through every stage, strictly in order.
///
/// The first failing stage aborts the run; nothing is retried here.
pub struct RagPipeline {
    expander: QueryExpander,
    retriever: Retriever,
    reranker: Reranker,
    filter: ContextFilter,
    generator: AnswerGenerator,
    extractor: AnswerExtractor,
}

impl RagPipeline {
    pub fn new(services: &PipelineServices, config: &FinragConfig) -> Result<Self, RagError> {
        let reranker = Reranker::from_parts(
            config.use_ground_truth_retrieval,
            services.scorer.clone(),
            config.top_k_rerank,
        )?;
        Ok(Self {
            expander: QueryExpander::new(services.llm.clone()),
            retriever: Retriever::new(services.search.clone(), config.top_k_retrieval),
            reranker,
            filter: ContextFilter::new(services.llm.clone()),
            generator: AnswerGenerator::new(services.llm.clone(), config.disable_llm_generation),
            extractor: AnswerExtractor::new(services.llm.clone(), config.disable_llm_generation),
        })
    }

    /// Answer a single question.
    pub async fn run(&self, question: &str) -> Result<PipelineState, RagError> {
        self.run_messages(vec![Message::user(question)]).await
    }

    /// Answer the last message of a conversation.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn run_messages(&self, messages: Vec<Message>) -> Result<PipelineState, RagError> {
        let started = Instant::now();
        let state = PipelineState::new(messages);

        let question = state
            .messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| RagError::invalid_input("no message to answer"))?;
        let state = state.with_question(question);

        let queries = self.expander.expand(&state.question).await?;
        let state = state.with_queries(queries);
        debug!(stage = %state.stage, queries = state.queries.len());

        let documents = self.retriever.retrieve(&state.queries, &state.question).await?;
        let state = state.with_documents(documents);
        debug!(stage = %state.stage, documents = state.documents.len());

        let outcome = self.reranker.rerank(&state.question, &state.documents).await?;
        let state = state.with_reranked(
            outcome.reranked,
            outcome.context_table,
            outcome.context_narrative,
        );
        debug!(stage = %state.stage, reranked = state.reranked_documents.len());

        let filtered = self
            .filter
            .filter(&state.question, &state.reranked_documents)
            .await?;
        let state = state.with_context(filtered.context, filtered.sources);
        debug!(stage = %state.stage, sources = state.sources.len());

        let generation = self
            .generator
            .generate(&state.question, &state.context_table, &state.context_narrative)
            .await?;
        let state = state.with_generation(generation.prompt, generation.text);
        debug!(stage = %state.stage);

        let answer = self
            .extractor
            .extract(&state.question, &state.generation)
            .await?;
        let state = state.with_answer(answer);

        info!(
            answer = %state.answer,
            duration_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        Ok(state)
    }
}
