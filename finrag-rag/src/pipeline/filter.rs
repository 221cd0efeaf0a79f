//! Context filtering: the model condenses reranked evidence and cites sources.

use super::prompts::{self, format_prompt};
use crate::error::RagError;
use finrag_core::brain::LlmProvider;
use finrag_core::types::{CompletionRequest, Evidence};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static SOURCES_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sources:").expect("valid sources pattern"));

/// Condensed context plus the source lines the model cited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredContext {
    pub context: String,
    pub sources: Vec<String>,
}

pub struct ContextFilter {
    llm: Arc<dyn LlmProvider>,
}

impl ContextFilter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn filter(&self, question: &str, reranked: &[Evidence]) -> Result<FilteredContext, RagError> {
        let documents = reranked
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format_prompt(&prompts::filter_context(question, &documents));
        let response = self.llm.complete(CompletionRequest::user_prompt(prompt)).await?;
        let filtered = parse_filtered_context(response.text());
        debug!(
            context_len = filtered.context.len(),
            sources = filtered.sources.len(),
            "Filtered context"
        );
        Ok(filtered)
    }
}

/// Split model output at the first case-insensitive `sources:` label.
///
/// Returns `None` when the label is absent.
pub fn split_sources(text: &str) -> Option<(&str, &str)> {
    SOURCES_LABEL
        .find(text)
        .map(|m| (&text[..m.start()], &text[m.end()..]))
}

/// Parse filter output into context and source lines.
///
/// `<OUTPUT>` tags are removed. Source lines are trimmed of leading list
/// markers; blank lines are dropped. Without a sources section the whole
/// text is the context.
pub fn parse_filtered_context(text: &str) -> FilteredContext {
    let text = text.replace("<OUTPUT>", "").replace("</OUTPUT>", "");
    match split_sources(&text) {
        Some((context, sources)) => FilteredContext {
            context: context.trim().to_string(),
            sources: sources
                .lines()
                .map(|line| line.trim().trim_start_matches(['-', ' ']).trim())
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        },
        None => FilteredContext {
            context: text.trim().to_string(),
            sources: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::brain::MockLlmProvider;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_with_sources() {
        let parsed = parse_filtered_context(
            "<OUTPUT>Revenue was 10.\nCosts were 4.\nSources:\n- AAPL/2019/p1\n\n  - AAPL/2019/p2 \n</OUTPUT>",
        );
        assert_eq!(parsed.context, "Revenue was 10.\nCosts were 4.");
        assert_eq!(parsed.sources, vec!["AAPL/2019/p1", "AAPL/2019/p2"]);
    }

    #[test]
    fn test_parse_label_case_insensitive_first_occurrence() {
        let parsed = parse_filtered_context("facts SOURCES: a\nsources: b");
        assert_eq!(parsed.context, "facts");
        assert_eq!(parsed.sources, vec!["a", "sources: b"]);
    }

    #[test]
    fn test_parse_without_sources() {
        let parsed = parse_filtered_context("<OUTPUT>  just facts  </OUTPUT>");
        assert_eq!(
            parsed,
            FilteredContext {
                context: "just facts".to_string(),
                sources: Vec::new(),
            }
        );
        assert!(split_sources("nothing here").is_none());
    }

    #[tokio::test]
    async fn test_filter_joins_documents_into_prompt() {
        let llm = Arc::new(MockLlmProvider::with_response("ctx\nSources:\n- d1"));
        let filter = ContextFilter::new(llm.clone());
        let docs = vec![
            Evidence::new("d1::t", "passage: alpha"),
            Evidence::new("d2::t", "passage: beta"),
        ];
        let filtered = filter.filter("q?", &docs).await.unwrap();
        assert_eq!(filtered.context, "ctx");
        assert_eq!(filtered.sources, vec!["d1"]);
        assert!(llm.requests()[0].last_text().contains("passage: alpha\npassage: beta"));
    }
}
