//! Evaluation result rows, the result table writer, and the summary.

use super::dataset::EvalExample;
use crate::error::RagError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: String,
    pub question: String,
    pub expected_answer: String,
    pub predicted_answer: String,
    pub generation: String,
    pub accuracy: f64,
    /// Retrieved identities joined with `", "`.
    pub retrieved_doc_ids: String,
    pub retrieval_precision: f64,
    pub retrieval_recall: f64,
    /// Reranked identities joined with `", "`.
    pub reranked_doc_ids: String,
    pub reranker_precision: f64,
    pub reranker_recall: f64,
    /// Wall-clock seconds for the pipeline run.
    pub latency: f64,
    pub prompt: String,
    /// Set when the pipeline failed for this example; all scores are then 0.
    pub error: Option<String>,
}

impl EvaluationResult {
    /// Record a pipeline failure as a zero-scored row.
    pub fn failed(example: &EvalExample, latency: f64, error: &RagError) -> Self {
        Self {
            id: example.id.clone(),
            question: example.question.clone(),
            expected_answer: example.expected_answer.clone(),
            predicted_answer: String::new(),
            generation: String::new(),
            accuracy: 0.0,
            retrieved_doc_ids: String::new(),
            retrieval_precision: 0.0,
            retrieval_recall: 0.0,
            reranked_doc_ids: String::new(),
            reranker_precision: 0.0,
            reranker_recall: 0.0,
            latency,
            prompt: String::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Column order of the result table.
pub const RESULT_COLUMNS: [&str; 15] = [
    "id",
    "question",
    "expected_answer",
    "predicted_answer",
    "generation",
    "accuracy",
    "retrieved_doc_ids",
    "retrieval_precision",
    "retrieval_recall",
    "reranked_doc_ids",
    "reranker_precision",
    "reranker_recall",
    "latency",
    "prompt",
    "error",
];

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn render_row(cells: &[Cell<'_>]) -> String {
    cells
        .iter()
        .map(|cell| match cell {
            Cell::Text(text) => quote(text),
            Cell::Number(n) => n.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render results as CSV: every text field quoted, numbers bare.
pub fn results_to_csv(results: &[EvaluationResult]) -> String {
    let header: Vec<Cell<'_>> = RESULT_COLUMNS.iter().map(|c| Cell::Text(*c)).collect();
    let mut out = render_row(&header);
    out.push('\n');
    for r in results {
        let row = [
            Cell::Text(&r.id),
            Cell::Text(&r.question),
            Cell::Text(&r.expected_answer),
            Cell::Text(&r.predicted_answer),
            Cell::Text(&r.generation),
            Cell::Number(r.accuracy),
            Cell::Text(&r.retrieved_doc_ids),
            Cell::Number(r.retrieval_precision),
            Cell::Number(r.retrieval_recall),
            Cell::Text(&r.reranked_doc_ids),
            Cell::Number(r.reranker_precision),
            Cell::Number(r.reranker_recall),
            Cell::Number(r.latency),
            Cell::Text(&r.prompt),
            Cell::Text(r.error.as_deref().unwrap_or_default()),
        ];
        out.push_str(&render_row(&row));
        out.push('\n');
    }
    out
}

/// Write the result table, creating parent directories as needed.
pub async fn write_results(path: &Path, results: &[EvaluationResult]) -> Result<(), RagError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, results_to_csv(results)).await?;
    Ok(())
}

/// Means over all result rows, failures included as zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub examples: usize,
    pub failures: usize,
    pub mean_accuracy: f64,
    pub mean_retrieval_precision: f64,
    pub mean_retrieval_recall: f64,
    pub mean_reranker_precision: f64,
    pub mean_reranker_recall: f64,
    pub mean_latency: f64,
    pub completed_at: DateTime<Utc>,
}

impl EvaluationSummary {
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        let mean = |f: fn(&EvaluationResult) -> f64| {
            if results.is_empty() {
                0.0
            } else {
                results.iter().map(f).sum::<f64>() / results.len() as f64
            }
        };
        Self {
            examples: results.len(),
            failures: results.iter().filter(|r| r.is_failure()).count(),
            mean_accuracy: mean(|r| r.accuracy),
            mean_retrieval_precision: mean(|r| r.retrieval_precision),
            mean_retrieval_recall: mean(|r| r.retrieval_recall),
            mean_reranker_precision: mean(|r| r.reranker_precision),
            mean_reranker_recall: mean(|r| r.reranker_recall),
            mean_latency: mean(|r| r.latency),
            completed_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Examples evaluated: {} ({} failed)", self.examples, self.failures)?;
        writeln!(f, "Average Accuracy: {:.2}%", self.mean_accuracy * 100.0)?;
        writeln!(
            f,
            "Average Retrieval Precision: {:.2}%",
            self.mean_retrieval_precision * 100.0
        )?;
        writeln!(f, "Average Retrieval Recall: {:.2}%", self.mean_retrieval_recall * 100.0)?;
        writeln!(
            f,
            "Average Rerank Precision: {:.2}%",
            self.mean_reranker_precision * 100.0
        )?;
        writeln!(f, "Average Rerank Recall: {:.2}%", self.mean_reranker_recall * 100.0)?;
        write!(f, "Average Latency: {:.2}s", self.mean_latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn example() -> EvalExample {
        EvalExample {
            id: "AAPL/2019/p1".to_string(),
            question: "What was \"net\" revenue?".to_string(),
            expected_answer: "260".to_string(),
        }
    }

    fn scored(accuracy: f64, latency: f64) -> EvaluationResult {
        EvaluationResult {
            accuracy,
            retrieval_precision: 0.5,
            retrieval_recall: 1.0,
            reranker_precision: 1.0,
            reranker_recall: 1.0,
            latency,
            error: None,
            predicted_answer: "260".to_string(),
            ..EvaluationResult::failed(&example(), latency, &RagError::evaluation("x"))
        }
    }

    #[test]
    fn test_failed_row_is_zeroed() {
        let row = EvaluationResult::failed(&example(), 1.5, &RagError::evaluation("boom"));
        assert!(row.is_failure());
        assert_eq!(row.accuracy, 0.0);
        assert_eq!(row.latency, 1.5);
        assert_eq!(row.error.as_deref(), Some("Evaluation error: boom"));
    }

    #[test]
    fn test_csv_quotes_text_and_leaves_numbers_bare() {
        let csv = results_to_csv(&[scored(1.0, 2.5)]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("\"id\",\"question\""));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"AAPL/2019/p1\",\"What was \"\"net\"\" revenue?\",\"260\",\"260\",\"\",1,"));
        assert!(row.ends_with(",2.5,\"\",\"\""));
    }

    #[test]
    fn test_csv_roundtrips_through_dataset_reader() {
        let mut row = scored(0.25, 1.0);
        row.generation = "line one\nline \"two\", done".to_string();
        let csv = results_to_csv(&[row.clone()]);
        let records = super::super::dataset::parse_csv(&csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), RESULT_COLUMNS.len());
        assert_eq!(records[1][4], row.generation);
        assert_eq!(records[1][5], "0.25");
    }

    #[test]
    fn test_summary_means_and_display() {
        let results = vec![
            scored(1.0, 2.0),
            EvaluationResult::failed(&example(), 4.0, &RagError::evaluation("x")),
        ];
        let summary = EvaluationSummary::from_results(&results);
        assert_eq!(summary.examples, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.mean_accuracy, 0.5);
        assert_eq!(summary.mean_retrieval_precision, 0.25);
        assert_eq!(summary.mean_latency, 3.0);

        let text = summary.to_string();
        assert!(text.contains("Average Accuracy: 50.00%"));
        assert!(text.contains("Average Retrieval Precision: 25.00%"));
        assert!(text.contains("Average Latency: 3.00s"));
        assert!(text.contains("(1 failed)"));
    }

    #[test]
    fn test_summary_empty() {
        let summary = EvaluationSummary::from_results(&[]);
        assert_eq!(summary.examples, 0);
        assert_eq!(summary.mean_accuracy, 0.0);
        assert_eq!(summary.mean_latency, 0.0);
    }

    #[tokio::test]
    async fn test_write_results_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("eval.csv");
        write_results(&path, &[scored(1.0, 1.0)]).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
