//! Answer generation.

use super::prompts::{self, format_prompt};
use crate::error::RagError;
use finrag_core::brain::LlmProvider;
use finrag_core::types::CompletionRequest;
use std::sync::Arc;
use tracing::debug;

/// Generation and answer text used when model generation is switched off.
pub const GENERATION_DISABLED: &str = "[GENERATION DISABLED]";

/// The generation prompt and the model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Template output before prompt formatting.
    pub prompt: String,
    pub text: String,
}

pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    disabled: bool,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, disabled: bool) -> Self {
        Self { llm, disabled }
    }

    pub async fn generate(
        &self,
        question: &str,
        context_table: &str,
        context_narrative: &str,
    ) -> Result<Generation, RagError> {
        let prompt = prompts::reason_and_answer(question, context_table, context_narrative);
        if self.disabled {
            debug!("Generation disabled, skipping model call");
            return Ok(Generation {
                prompt,
                text: GENERATION_DISABLED.to_string(),
            });
        }
        let response = self
            .llm
            .complete(CompletionRequest::user_prompt(format_prompt(&prompt)))
            .await?;
        debug!(
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "Generated answer"
        );
        Ok(Generation {
            text: response.text().to_string(),
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::brain::MockLlmProvider;

    #[tokio::test]
    async fn test_generate_keeps_unformatted_prompt() {
        let llm = Arc::new(MockLlmProvider::with_response("reasoning <ANSWER>5</ANSWER>"));
        let generator = AnswerGenerator::new(llm.clone(), false);
        let generation = generator.generate("q?", "| t |", "narr").await.unwrap();
        assert_eq!(generation.text, "reasoning <ANSWER>5</ANSWER>");
        assert_eq!(generation.prompt, prompts::reason_and_answer("q?", "| t |", "narr"));
        assert!(generation.prompt.contains("\n\n"));
        assert_eq!(llm.requests()[0].last_text(), format_prompt(&generation.prompt));
    }

    #[tokio::test]
    async fn test_generate_disabled_makes_no_call() {
        let llm = Arc::new(MockLlmProvider::new());
        let generator = AnswerGenerator::new(llm.clone(), true);
        let generation = generator.generate("q?", "t", "n").await.unwrap();
        assert_eq!(generation.text, GENERATION_DISABLED);
        assert!(generation.prompt.contains("q?"));
        assert_eq!(llm.call_count(), 0);
    }
}
