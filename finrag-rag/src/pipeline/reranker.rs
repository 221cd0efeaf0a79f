//! Reranking and the table/narrative split of the chosen evidence.

use crate::error::RagError;
use finrag_core::error::{ConfigError, RerankError};
use finrag_core::rerank::{RelevanceScorer, RerankCandidate};
use finrag_core::search::PASSAGE_MARKER;
use finrag_core::types::Evidence;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Output of the rerank stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RerankOutcome {
    pub reranked: Vec<Evidence>,
    pub context_table: String,
    pub context_narrative: String,
}

/// How the reranked set is chosen.
pub enum RerankMode {
    /// Use retrieval output as-is, in retrieval order.
    GroundTruth,
    /// Order by an external relevance scorer and keep the top `top_k`.
    Scored {
        scorer: Arc<dyn RelevanceScorer>,
        top_k: usize,
    },
}

pub struct Reranker {
    mode: RerankMode,
}

impl Reranker {
    pub fn new(mode: RerankMode) -> Self {
        Self { mode }
    }

    /// Build from configuration; scored mode needs a scorer.
    pub fn from_parts(
        ground_truth: bool,
        scorer: Option<Arc<dyn RelevanceScorer>>,
        top_k: usize,
    ) -> Result<Self, ConfigError> {
        let mode = if ground_truth {
            RerankMode::GroundTruth
        } else {
            let scorer = scorer.ok_or_else(|| ConfigError::Invalid {
                message: "a relevance scorer is required unless ground-truth retrieval is enabled"
                    .to_string(),
            })?;
            RerankMode::Scored { scorer, top_k }
        };
        Ok(Self::new(mode))
    }

    pub async fn rerank(&self, question: &str, documents: &[Evidence]) -> Result<RerankOutcome, RagError> {
        let reranked = match &self.mode {
            RerankMode::GroundTruth => documents.to_vec(),
            RerankMode::Scored { .. } if documents.is_empty() => Vec::new(),
            RerankMode::Scored { scorer, top_k } => {
                let candidates: Vec<RerankCandidate> = documents
                    .iter()
                    .map(|d| RerankCandidate {
                        identity: d.identity.clone(),
                        text: d.content.clone(),
                    })
                    .collect();
                let order = scorer.rerank(question, &candidates, *top_k).await?;
                select_ranked(documents, &order, *top_k)?
            }
        };
        debug!(input = documents.len(), kept = reranked.len(), "Reranked evidence");

        let (context_table, context_narrative) = split_context(&reranked);
        Ok(RerankOutcome {
            reranked,
            context_table,
            context_narrative,
        })
    }
}

/// Pick documents by scorer index, skipping repeats, at most `top_k`.
fn select_ranked(documents: &[Evidence], order: &[usize], top_k: usize) -> Result<Vec<Evidence>, RerankError> {
    let mut used = HashSet::new();
    let mut selected = Vec::new();
    for &index in order {
        if selected.len() >= top_k {
            break;
        }
        let doc = documents.get(index).ok_or(RerankError::IndexOutOfRange {
            index,
            len: documents.len(),
        })?;
        if used.insert(index) {
            selected.push(doc.clone());
        }
    }
    Ok(selected)
}

/// Split one evidence text into `(table, narrative)`.
///
/// The payload is the text after the last `passage:` marker (or the whole
/// text), split at the first blank line. Both parts are trimmed.
pub fn split_evidence(content: &str) -> (String, String) {
    let payload = content
        .rsplit_once(PASSAGE_MARKER)
        .map(|(_, rest)| rest)
        .unwrap_or(content)
        .trim();
    match payload.split_once("\n\n") {
        Some((table, narrative)) => (table.trim().to_string(), narrative.trim().to_string()),
        None => (payload.to_string(), String::new()),
    }
}

/// Concatenate the table and narrative parts of `documents`, blank-line separated.
pub fn split_context(documents: &[Evidence]) -> (String, String) {
    let (tables, narratives): (Vec<String>, Vec<String>) =
        documents.iter().map(|d| split_evidence(&d.content)).unzip();
    (tables.join("\n\n"), narratives.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::rerank::MockReranker;
    use pretty_assertions::assert_eq;

    fn docs(n: usize) -> Vec<Evidence> {
        (0..n)
            .map(|i| Evidence::new(format!("d{}::t", i), format!("passage: T{}\n\nN{}", i, i)))
            .collect()
    }

    #[test]
    fn test_split_evidence_table_and_narrative() {
        assert_eq!(
            split_evidence("passage: A | B\n\nSome text"),
            ("A | B".to_string(), "Some text".to_string())
        );
    }

    #[test]
    fn test_split_evidence_no_blank_line() {
        assert_eq!(split_evidence("passage: C"), ("C".to_string(), String::new()));
    }

    #[test]
    fn test_split_evidence_uses_last_marker() {
        assert_eq!(
            split_evidence("passage: old\n\nx passage:  new table\n\n more \n\n rest"),
            ("new table".to_string(), "more \n\n rest".to_string())
        );
    }

    #[test]
    fn test_split_evidence_without_marker() {
        assert_eq!(
            split_evidence("  plain\n\ntext "),
            ("plain".to_string(), "text".to_string())
        );
    }

    #[test]
    fn test_split_context_joins_parts() {
        let docs = vec![
            Evidence::new("a::1", "passage: A | B\n\nSome text"),
            Evidence::new("b::1", "passage: C"),
        ];
        let (table, narrative) = split_context(&docs);
        assert_eq!(table, "A | B\n\nC");
        assert_eq!(narrative, "Some text\n\n");
    }

    #[tokio::test]
    async fn test_ground_truth_passes_through() {
        let reranker = Reranker::new(RerankMode::GroundTruth);
        let input = docs(7);
        let outcome = reranker.rerank("q", &input).await.unwrap();
        assert_eq!(outcome.reranked, input);
        assert!(outcome.context_table.starts_with("T0\n\nT1"));
    }

    #[tokio::test]
    async fn test_scored_orders_and_caps() {
        let scorer = Arc::new(MockReranker::with_ranking(vec![3, 0, 2, 1]));
        let reranker = Reranker::new(RerankMode::Scored {
            scorer: scorer.clone(),
            top_k: 2,
        });
        let outcome = reranker.rerank("q", &docs(4)).await.unwrap();
        let ids: Vec<_> = outcome.reranked.iter().map(|d| d.identity.as_str()).collect();
        assert_eq!(ids, vec!["d3::t", "d0::t"]);
        assert_eq!(outcome.context_table, "T3\n\nT0");
        assert_eq!(outcome.context_narrative, "N3\n\nN0");
        assert_eq!(scorer.calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_scored_empty_input_skips_scorer() {
        let scorer = Arc::new(MockReranker::new());
        let reranker = Reranker::new(RerankMode::Scored {
            scorer: scorer.clone(),
            top_k: 5,
        });
        let outcome = reranker.rerank("q", &[]).await.unwrap();
        assert_eq!(outcome, RerankOutcome::default());
        assert!(scorer.calls().is_empty());
    }

    #[test]
    fn test_select_ranked_rejects_bad_index() {
        let err = select_ranked(&docs(2), &[0, 5], 5).unwrap_err();
        assert!(matches!(err, RerankError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn test_select_ranked_skips_duplicates() {
        let selected = select_ranked(&docs(3), &[1, 1, 2], 5).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_from_parts_requires_scorer_in_scored_mode() {
        assert!(Reranker::from_parts(false, None, 5).is_err());
        assert!(Reranker::from_parts(true, None, 5).is_ok());
    }
}
