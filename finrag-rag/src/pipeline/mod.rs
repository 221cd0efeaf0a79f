//! Answering pipeline stages and their orchestration.

pub mod extract;
pub mod filter;
pub mod generate;
pub mod orchestrator;
pub mod prompts;
pub mod query;
pub mod reranker;
pub mod retriever;
pub mod state;

pub use extract::{AnswerExtractor, parse_tagged_answer};
pub use filter::{ContextFilter, FilteredContext, parse_filtered_context};
pub use generate::{AnswerGenerator, GENERATION_DISABLED, Generation};
pub use orchestrator::RagPipeline;
pub use query::QueryExpander;
pub use reranker::{RerankMode, RerankOutcome, Reranker, split_context, split_evidence};
pub use retriever::{Retriever, extract_years, filter_by_years};
pub use state::{PipelineStage, PipelineState};
