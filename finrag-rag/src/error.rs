//! Error types for the finrag-rag crate.

use finrag_core::error::{ConfigError, FinragError, LlmError, RerankError, SearchError};
use thiserror::Error;

/// Top-level error type for pipeline and evaluation operations.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Rerank error: {0}")]
    Rerank(#[from] RerankError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

impl From<FinragError> for RagError {
    fn from(err: FinragError) -> Self {
        match err {
            FinragError::Llm(e) => Self::Llm(e),
            FinragError::Search(e) => Self::Search(e),
            FinragError::Rerank(e) => Self::Rerank(e),
            FinragError::Config(e) => Self::Config(e),
            FinragError::Io(e) => Self::Io(e),
            FinragError::Serialization(e) => Self::Evaluation(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for RagError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_source() {
        let err: RagError = LlmError::Timeout { timeout_secs: 30 }.into();
        assert_eq!(err.to_string(), "LLM error: Request timed out after 30s");
    }

    #[test]
    fn test_from_core_error_preserves_kind() {
        let core = FinragError::Rerank(RerankError::IndexOutOfRange { index: 4, len: 2 });
        let err: RagError = core.into();
        assert!(matches!(err, RagError::Rerank(RerankError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            RagError::dataset("missing column 'question'").to_string(),
            "Dataset error: missing column 'question'"
        );
        assert!(matches!(RagError::invalid_input("x"), RagError::InvalidInput(_)));
    }
}
