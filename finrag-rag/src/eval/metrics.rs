//! Per-example metrics: answer accuracy and document-level retrieval quality.

use super::scoring::{exact_match, numeric_match};
use finrag_core::types::base_document_id;

/// Accuracy of a predicted answer in `[0, 1]`.
///
/// An empty prediction scores 0 against a non-empty expectation. Otherwise an
/// exact (case-insensitive) match scores 1, and numeric answers get partial
/// credit by relative error.
pub fn compute_accuracy(predicted: &str, expected: &str) -> f64 {
    if predicted.trim().is_empty() && !expected.trim().is_empty() {
        return 0.0;
    }
    if exact_match(predicted, expected) {
        return 1.0;
    }
    numeric_match(predicted, expected)
}

fn contains_base(predicted_ids: &[String], expected_id: &str) -> bool {
    let expected = base_document_id(expected_id);
    predicted_ids
        .iter()
        .any(|id| base_document_id(id) == expected)
}

/// `1 / len` when the expected document is among `predicted_ids`, else 0.
///
/// Identities are compared by base document id.
pub fn compute_precision(predicted_ids: &[String], expected_id: &str) -> f64 {
    if contains_base(predicted_ids, expected_id) {
        1.0 / predicted_ids.len() as f64
    } else {
        0.0
    }
}

/// 1 when the expected document is among `predicted_ids`, else 0.
pub fn compute_recall(predicted_ids: &[String], expected_id: &str) -> f64 {
    if contains_base(predicted_ids, expected_id) { 1.0 } else { 0.0 }
}
