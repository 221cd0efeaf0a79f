//! Query expansion: ask the model for retrieval queries.

use super::prompts::{self, format_prompt};
use crate::error::RagError;
use finrag_core::brain::LlmProvider;
use finrag_core::types::CompletionRequest;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct QueryExpander {
    llm: Arc<dyn LlmProvider>,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Produce retrieval queries for `question`; the question itself is always included.
    pub async fn expand(&self, question: &str) -> Result<Vec<String>, RagError> {
        let prompt = format_prompt(&prompts::generate_queries(question));
        let response = self.llm.complete(CompletionRequest::user_prompt(prompt)).await?;
        let queries = parse_queries(response.text(), question);
        debug!(count = queries.len(), "Expanded question into queries");
        Ok(queries)
    }
}

/// One query per non-blank line, trimmed, first occurrence kept.
///
/// The question is appended unless it already appears verbatim.
pub fn parse_queries(response: &str, question: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut queries: Vec<String> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(String::from)
        .collect();
    if !queries.iter().any(|q| q == question) {
        queries.push(question.to_string());
    }
    queries
}
