//! Batch evaluation: dataset loading, scoring, concurrent runs, and reporting.

pub mod dataset;
pub mod harness;
pub mod metrics;
pub mod report;
pub mod scoring;

pub use dataset::{EvalExample, load_dataset, parse_csv, parse_examples};
pub use harness::{EvaluationHarness, EvaluationReport, evaluate_example};
pub use metrics::{compute_accuracy, compute_precision, compute_recall};
pub use report::{EvaluationResult, EvaluationSummary, RESULT_COLUMNS, results_to_csv, write_results};
pub use scoring::{exact_match, numeric_match, parse_number, relative_score};
