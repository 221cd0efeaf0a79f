//! # finrag core
//!
//! Core library for finrag. Provides the message and evidence types, the
//! error taxonomy, layered configuration, and the external service clients the
//! answering pipeline talks to: the language model (`brain`), the embedding
//! endpoint, the on-disk evidence index, and the relevance reranker.

pub mod brain;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod providers;
pub mod rerank;
pub mod search;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::FinragConfig;
pub use embeddings::{Embedder, LocalEmbedder, OpenAiEmbedder};
pub use error::{ConfigError, FinragError, LlmError, RerankError, Result, SearchError};
pub use rerank::{CohereReranker, MockReranker, RelevanceScorer, RerankCandidate};
pub use search::{EvidenceIndex, MockSearch, SimilaritySearch};
pub use types::{
    CompletionRequest, CompletionResponse, Evidence, Message, Role, TokenUsage, base_document_id,
};
