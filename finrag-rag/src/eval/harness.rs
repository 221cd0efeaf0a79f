//! Concurrent batch evaluation of the answering pipeline.

use super::dataset::EvalExample;
use super::metrics::{compute_accuracy, compute_precision, compute_recall};
use super::report::{EvaluationResult, EvaluationSummary, write_results};
use crate::error::RagError;
use crate::pipeline::RagPipeline;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Results of a batch run, in dataset order, with their summary.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub results: Vec<EvaluationResult>,
    pub summary: EvaluationSummary,
}

/// Runs the pipeline over a dataset with at most `concurrency` examples in flight.
///
/// Examples share one pipeline and its service clients. A failed example is
/// recorded as a zero-scored row and never aborts the batch.
pub struct EvaluationHarness {
    pipeline: Arc<RagPipeline>,
    concurrency: usize,
}

impl EvaluationHarness {
    pub fn new(pipeline: Arc<RagPipeline>, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run(&self, examples: &[EvalExample]) -> Vec<EvaluationResult> {
        let start = Instant::now();
        let total = examples.len();
        info!(total, concurrency = self.concurrency, "Evaluating examples");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(total);

        for example in examples.iter().cloned() {
            let pipeline = Arc::clone(&self.pipeline);
            let sem = semaphore.clone();
            let completed = completed.clone();

            let handle = tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return EvaluationResult::failed(&example, 0.0, &RagError::evaluation(e.to_string()));
                    }
                };
                let result = evaluate_example(&pipeline, &example).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    done,
                    total,
                    id = %result.id,
                    accuracy = result.accuracy,
                    failed = result.is_failure(),
                    "Example evaluated"
                );
                result
            });
            handles.push(handle);
        }

        // Awaiting handles in spawn order keeps results in dataset order.
        let mut results = Vec::with_capacity(total);
        for (handle, example) in handles.into_iter().zip(examples) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    let err = RagError::from(e);
                    warn!(id = %example.id, error = %err, "Evaluation task aborted");
                    results.push(EvaluationResult::failed(example, 0.0, &err));
                }
            }
        }

        info!(
            total,
            failures = results.iter().filter(|r| r.is_failure()).count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Evaluation finished"
        );
        results
    }

    /// Run the batch, write the result table to `output`, and summarize.
    pub async fn run_and_save(
        &self,
        examples: &[EvalExample],
        output: &Path,
    ) -> Result<EvaluationReport, RagError> {
        let results = self.run(examples).await;
        write_results(output, &results).await?;
        info!(path = %output.display(), rows = results.len(), "Results saved");
        let summary = EvaluationSummary::from_results(&results);
        Ok(EvaluationReport { results, summary })
    }
}

/// Run one example through the pipeline and score it.
pub async fn evaluate_example(pipeline: &RagPipeline, example: &EvalExample) -> EvaluationResult {
    let start = Instant::now();
    let outcome = pipeline.run(&example.question).await;
    let latency = start.elapsed().as_secs_f64();

    let state = match outcome {
        Ok(state) => state,
        Err(e) => {
            warn!(id = %example.id, error = %e, "Pipeline failed for example");
            return EvaluationResult::failed(example, latency, &e);
        }
    };

    let retrieved = state.retrieved_ids();
    let reranked = state.reranked_ids();
    EvaluationResult {
        id: example.id.clone(),
        question: example.question.clone(),
        expected_answer: example.expected_answer.clone(),
        accuracy: compute_accuracy(&state.answer, &example.expected_answer),
        predicted_answer: state.answer,
        generation: state.generation,
        retrieval_precision: compute_precision(&retrieved, &example.id),
        retrieval_recall: compute_recall(&retrieved, &example.id),
        retrieved_doc_ids: retrieved.join(", "),
        reranker_precision: compute_precision(&reranked, &example.id),
        reranker_recall: compute_recall(&reranked, &example.id),
        reranked_doc_ids: reranked.join(", "),
        latency,
        prompt: state.prompt,
        error: None,
    }
}
