//! Final answer extraction from the generation.

use super::generate::GENERATION_DISABLED;
use super::prompts::{self, format_prompt};
use crate::error::RagError;
use finrag_core::brain::LlmProvider;
use finrag_core::types::CompletionRequest;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static ANSWER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<ANSWER>(.*?)</ANSWER>").expect("valid answer pattern"));

/// Content of the first `<ANSWER>...</ANSWER>` span, trimmed.
pub fn parse_tagged_answer(generation: &str) -> Option<String> {
    ANSWER_TAG
        .captures(generation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

pub struct AnswerExtractor {
    llm: Arc<dyn LlmProvider>,
    disabled: bool,
}

impl AnswerExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, disabled: bool) -> Self {
        Self { llm, disabled }
    }

    /// Tagged answer if present, otherwise one fallback model call.
    pub async fn extract(&self, question: &str, generation: &str) -> Result<String, RagError> {
        if self.disabled {
            return Ok(GENERATION_DISABLED.to_string());
        }
        if let Some(answer) = parse_tagged_answer(generation) {
            return Ok(answer);
        }

        debug!("No tagged answer, asking model to extract one");
        let prompt = format_prompt(&prompts::extract_answer(question, generation));
        let response = self.llm.complete(CompletionRequest::user_prompt(prompt)).await?;
        Ok(response.text().trim().to_string())
    }
}
