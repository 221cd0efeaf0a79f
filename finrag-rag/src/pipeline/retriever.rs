//! Concurrent evidence retrieval with deduplication and year filtering.

use crate::error::RagError;
use finrag_core::search::SimilaritySearch;
use finrag_core::types::Evidence;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::task::JoinSet;
use tracing::{debug, warn};

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year pattern"));

pub struct Retriever {
    search: Arc<dyn SimilaritySearch>,
    top_k: usize,
}

impl Retriever {
    pub fn new(search: Arc<dyn SimilaritySearch>, top_k: usize) -> Self {
        Self { search, top_k }
    }

    /// Run every query concurrently and merge results as searches complete.
    ///
    /// Documents are kept at first sighting of their identity. If the question
    /// names years, documents whose identity mentions none of them are dropped,
    /// unless that would leave nothing. Any failed search fails the stage,
    /// after all in-flight searches have finished.
    pub async fn retrieve(&self, queries: &[String], question: &str) -> Result<Vec<Evidence>, RagError> {
        let mut searches = JoinSet::new();
        for query in queries {
            let search = Arc::clone(&self.search);
            let query = query.clone();
            let k = self.top_k;
            searches.spawn(async move { search.search(&query, k).await });
        }

        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        let mut first_error: Option<RagError> = None;
        while let Some(joined) = searches.join_next().await {
            match joined.map_err(RagError::from).and_then(|r| r.map_err(RagError::from)) {
                Ok(batch) => {
                    for doc in batch {
                        if seen.insert(doc.identity.clone()) {
                            documents.push(doc);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Similarity search failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let years = extract_years(question);
        let total = documents.len();
        let documents = filter_by_years(documents, &years);
        debug!(
            queries = queries.len(),
            unique = total,
            kept = documents.len(),
            years = ?years,
            "Retrieved evidence"
        );
        Ok(documents)
    }
}

/// Four-digit years from 1900 to 2099 appearing as whole tokens, in order.
pub fn extract_years(text: &str) -> Vec<String> {
    YEAR_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Keep documents whose identity contains one of `years`.
///
/// Returns the input unchanged when `years` is empty or nothing matches.
pub fn filter_by_years(documents: Vec<Evidence>, years: &[String]) -> Vec<Evidence> {
    if years.is_empty() {
        return documents;
    }
    let matching = |doc: &Evidence| years.iter().any(|y| doc.identity.contains(y.as_str()));
    if !documents.iter().any(matching) {
        return documents;
    }
    documents.into_iter().filter(|d| matching(d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::search::MockSearch;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::time::Duration;

    fn doc(id: &str) -> Evidence {
        Evidence::new(id, format!("passage: table for {}", id))
    }

    fn ids(docs: &[Evidence]) -> Vec<&str> {
        docs.iter().map(|d| d.identity.as_str()).collect()
    }

    #[test]
    fn test_extract_years() {
        assert_eq!(
            extract_years("change from 2018 to 2019, vs 1999 and 2100 or 12019"),
            vec!["2018", "2019", "1999"]
        );
        assert!(extract_years("no years here").is_empty());
    }

    #[test]
    fn test_filter_by_years_keeps_matches() {
        let docs = vec![doc("AAPL/2019/p1::t"), doc("AAPL/2017/p2::t"), doc("MSFT/2019/p3::t")];
        let kept = filter_by_years(docs, &["2019".to_string()]);
        assert_eq!(ids(&kept), vec!["AAPL/2019/p1::t", "MSFT/2019/p3::t"]);
    }

    #[test]
    fn test_filter_by_years_falls_back_when_nothing_matches() {
        let docs = vec![doc("AAPL/2017/p1::t"), doc("AAPL/2016/p2::t")];
        let kept = filter_by_years(docs.clone(), &["2019".to_string()]);
        assert_eq!(kept, docs);
    }

    #[test]
    fn test_filter_by_years_no_years() {
        let docs = vec![doc("a::1")];
        assert_eq!(filter_by_years(docs.clone(), &[]), docs);
    }

    #[tokio::test]
    async fn test_retrieve_dedups_across_queries() {
        let search = MockSearch::new()
            .with_results("q1", vec![doc("A::1"), doc("B::1")])
            .with_results("q2", vec![doc("B::1"), doc("C::1")]);
        let retriever = Retriever::new(Arc::new(search), 10);
        let docs = retriever
            .retrieve(&["q1".to_string(), "q2".to_string()], "no year")
            .await
            .unwrap();
        let mut got = ids(&docs);
        got.sort();
        assert_eq!(got, vec!["A::1", "B::1", "C::1"]);
    }

    #[tokio::test]
    async fn test_retrieve_merges_in_completion_order() {
        let search = MockSearch::new()
            .with_results("slow", vec![doc("S::1"), doc("S::2")])
            .with_delay("slow", Duration::from_secs(1))
            .with_results("fast", vec![doc("F::1")]);
        let retriever = Retriever::new(Arc::new(search), 10);
        let docs = retriever
            .retrieve(&["slow".to_string(), "fast".to_string()], "q")
            .await
            .unwrap();
        let got: HashSet<&str> = ids(&docs).into_iter().collect();
        assert_eq!(got, HashSet::from(["F::1", "S::1", "S::2"]));
        // The undelayed query is merged first even though it was issued second.
        assert_eq!(docs[0].identity, "F::1");
    }

    #[tokio::test]
    async fn test_retrieve_applies_year_filter() {
        let search = MockSearch::new()
            .with_results("q", vec![doc("X/2018/p::t"), doc("X/2019/p::t")]);
        let retriever = Retriever::new(Arc::new(search), 10);
        let docs = retriever
            .retrieve(&["q".to_string()], "What was revenue in 2019?")
            .await
            .unwrap();
        assert_eq!(ids(&docs), vec!["X/2019/p::t"]);
    }

    #[tokio::test]
    async fn test_retrieve_search_failure_fails_stage() {
        let search = Arc::new(
            MockSearch::new()
                .with_results("ok", vec![doc("A::1")])
                .with_failure("bad", "embedding service down"),
        );
        let retriever = Retriever::new(search.clone(), 10);
        let err = retriever
            .retrieve(&["ok".to_string(), "bad".to_string()], "q")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Search(_)));
        assert_eq!(search.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_no_queries() {
        let retriever = Retriever::new(Arc::new(MockSearch::new()), 10);
        assert!(retriever.retrieve(&[], "q").await.unwrap().is_empty());
    }
}
