//! Batch extraction: one parse per task, fan-out / fan-in, no shared state.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use flowgraph_shared::{ExtractOptions, FlowGraphError, Result};

use crate::pipeline::{self, Extraction};

/// Progress callback for batch runs.
pub trait BatchProgress: Send + Sync {
    /// Called once per document, in input order, after its result is collected.
    fn document_done(&self, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn document_done(&self, _current: usize, _total: usize) {}
}

/// Outcome for one input document.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the document in the input.
    pub index: usize,
    /// `Err` only when the worker task itself failed.
    pub extraction: Result<Extraction>,
}

/// Extract every document concurrently, at most `batch_concurrency` at a time.
///
/// Parsing is CPU-bound, so each document runs on the blocking pool. Results
/// come back in input order. No fallback sample is substituted.
#[instrument(skip_all, fields(documents = documents.len(), concurrency = opts.batch_concurrency))]
pub async fn extract_batch(
    documents: Vec<String>,
    opts: &ExtractOptions,
    progress: &dyn BatchProgress,
) -> Vec<BatchOutcome> {
    let total = documents.len();
    let semaphore = Arc::new(Semaphore::new(opts.batch_concurrency.max(1)));

    let mut handles = Vec::with_capacity(total);
    for text in documents {
        let sem = semaphore.clone();
        let opts = *opts;

        handles.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| FlowGraphError::Task(e.to_string()))?;

            tokio::task::spawn_blocking(move || pipeline::extract(&text, &opts))
                .await
                .map_err(|e| FlowGraphError::Task(e.to_string()))
        }));
    }

    let mut outcomes = Vec::with_capacity(total);
    for (index, handle) in handles.into_iter().enumerate() {
        let extraction = match handle.await {
            Ok(result) => result,
            Err(e) => Err(FlowGraphError::Task(e.to_string())),
        };

        if let Err(e) = &extraction {
            warn!(index, error = %e, "batch document failed");
        }

        progress.document_done(index + 1, total);
        outcomes.push(BatchOutcome { index, extraction });
    }

    let graphs = outcomes
        .iter()
        .filter(|o| matches!(o.extraction, Ok(Extraction::Graph { .. })))
        .count();
    info!(documents = total, graphs, "batch complete");

    outcomes
}
