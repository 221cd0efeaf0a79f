//! # finrag-rag: answering pipeline and evaluation
//!
//! The answering pipeline turns one financial question into a grounded answer
//! through a fixed sequence of stages:
//!
//! 1. **Query expansion**: the model proposes retrieval queries
//! 2. **Retrieval**: concurrent similarity search, deduplication, year filtering
//! 3. **Reranking**: relevance scoring and table/narrative evidence split
//! 4. **Context filtering**: the model condenses evidence and cites sources
//! 5. **Generation**: the model reasons to a tagged answer
//! 6. **Extraction**: the tagged answer is parsed, with one fallback call
//!
//! The evaluation harness runs the pipeline over a labeled dataset on a
//! bounded worker pool and scores answers, retrieval, and reranking.

pub mod error;
pub mod eval;
pub mod pipeline;
pub mod services;

// Re-exports
pub use error::RagError;
pub use eval::{EvalExample, EvaluationHarness, EvaluationResult, EvaluationSummary};
pub use pipeline::{PipelineStage, PipelineState, RagPipeline};
pub use services::PipelineServices;
