//! Pipeline state threaded through the answering stages.
//!
//! Each stage consumes a state and returns a new one with its own fields
//! filled in; the previous stage's output is never mutated in place.

use finrag_core::types::{Evidence, Message};
use serde::{Deserialize, Serialize};

/// How far a state has progressed through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Initial,
    QuestionExtracted,
    QueriesExpanded,
    Retrieved,
    Reranked,
    ContextFiltered,
    Generated,
    Terminal,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::QuestionExtracted => "question_extracted",
            Self::QueriesExpanded => "queries_expanded",
            Self::Retrieved => "retrieved",
            Self::Reranked => "reranked",
            Self::ContextFiltered => "context_filtered",
            Self::Generated => "generated",
            Self::Terminal => "terminal",
        };
        write!(f, "{}", name)
    }
}

/// The record carried from stage to stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub stage: PipelineStage,
    /// Conversation history; the last message is the question.
    pub messages: Vec<Message>,
    pub question: String,
    pub queries: Vec<String>,
    /// Deduplicated retrieval output, unique by identity.
    pub documents: Vec<Evidence>,
    pub reranked_documents: Vec<Evidence>,
    pub context_table: String,
    pub context_narrative: String,
    pub context: String,
    pub sources: Vec<String>,
    /// The exact generation prompt, before prompt formatting.
    pub prompt: String,
    pub generation: String,
    pub answer: String,
}

impl PipelineState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Start from a single user question.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self::new(vec![Message::user(question)])
    }

    pub fn with_question(self, question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            stage: PipelineStage::QuestionExtracted,
            ..self
        }
    }

    pub fn with_queries(self, queries: Vec<String>) -> Self {
        Self {
            queries,
            stage: PipelineStage::QueriesExpanded,
            ..self
        }
    }

    pub fn with_documents(self, documents: Vec<Evidence>) -> Self {
        Self {
            documents,
            stage: PipelineStage::Retrieved,
            ..self
        }
    }

    pub fn with_reranked(
        self,
        reranked_documents: Vec<Evidence>,
        context_table: String,
        context_narrative: String,
    ) -> Self {
        Self {
            reranked_documents,
            context_table,
            context_narrative,
            stage: PipelineStage::Reranked,
            ..self
        }
    }

    pub fn with_context(self, context: String, sources: Vec<String>) -> Self {
        Self {
            context,
            sources,
            stage: PipelineStage::ContextFiltered,
            ..self
        }
    }

    pub fn with_generation(self, prompt: String, generation: String) -> Self {
        Self {
            prompt,
            generation,
            stage: PipelineStage::Generated,
            ..self
        }
    }

    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            stage: PipelineStage::Terminal,
            ..self
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage == PipelineStage::Terminal
    }

    /// Identities of the retrieved documents, in retrieval order.
    pub fn retrieved_ids(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.identity.clone()).collect()
    }

    /// Identities of the reranked documents, in rank order.
    pub fn reranked_ids(&self) -> Vec<String> {
        self.reranked_documents
            .iter()
            .map(|d| d.identity.clone())
            .collect()
    }
}
