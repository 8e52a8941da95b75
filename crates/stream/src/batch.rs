//! Parallel rendering of independent documents.

use crate::renderer::{RenderOutput, StreamRenderer};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use xssr_core::{RenderError, VirtualNode};

/// One document to render.
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Document identifier, echoed in the result.
    pub id: String,
    /// Root of the document.
    pub root: VirtualNode,
}

impl BatchInput {
    /// Creates an input.
    pub fn new(id: impl Into<String>, root: VirtualNode) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }
}

/// Result for a single document in a batch.
#[derive(Debug)]
pub struct BatchResult {
    /// Document identifier matching the input.
    pub id: String,
    /// Render output (present on success).
    pub result: Option<RenderOutput>,
    /// Render error (present on failure).
    pub error: Option<RenderError>,
}

/// Statistics for batch rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStats {
    /// Total number of documents submitted.
    pub total: u32,
    /// Number of successful renders.
    pub succeeded: u32,
    /// Number of failed renders.
    pub failed: u32,
    /// Total processing time in milliseconds.
    pub processing_time_ms: f64,
}

/// Options for batch rendering.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of threads to use. Defaults to rayon's global pool.
    pub max_threads: Option<usize>,
    /// Whether to keep rendering after a failure. Defaults to true.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_threads: None,
            continue_on_error: true,
        }
    }
}

/// All results of a batch, in input order, plus statistics.
#[derive(Debug)]
pub struct BatchProcessingResult {
    /// Individual results.
    pub results: Vec<BatchResult>,
    /// Processing statistics.
    pub stats: BatchStats,
}

/// Renders every input to a string, in parallel unless `continue_on_error`
/// is off, in which case inputs are rendered in order until the first failure.
pub fn render_batch(
    renderer: &StreamRenderer,
    inputs: Vec<BatchInput>,
    options: &BatchOptions,
) -> BatchProcessingResult {
    let start = Instant::now();

    let pool = options.max_threads.and_then(|max_threads| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(max_threads)
            .build()
            .map_err(|err| log::warn!("falling back to the global thread pool: {}", err))
            .ok()
    });

    let total = u32::try_from(inputs.len()).unwrap_or(u32::MAX);
    let succeeded = AtomicU32::new(0);
    let failed = AtomicU32::new(0);

    let process_input = |input: BatchInput| -> BatchResult {
        match renderer.render(input.root) {
            Ok(output) => {
                succeeded.fetch_add(1, Ordering::Relaxed);
                BatchResult {
                    id: input.id,
                    result: Some(output),
                    error: None,
                }
            }
            Err(err) => {
                log::debug!("batch document `{}` failed: {}", input.id, err);
                failed.fetch_add(1, Ordering::Relaxed);
                BatchResult {
                    id: input.id,
                    result: None,
                    error: Some(err),
                }
            }
        }
    };

    let results: Vec<BatchResult> = if options.continue_on_error {
        match &pool {
            Some(pool) => pool.install(|| inputs.into_par_iter().map(process_input).collect()),
            None => inputs.into_par_iter().map(process_input).collect(),
        }
    } else {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let result = process_input(input);
            let stop = result.error.is_some();
            results.push(result);
            if stop {
                break;
            }
        }
        results
    };

    let elapsed = start.elapsed();
    let stats = BatchStats {
        total,
        succeeded: succeeded.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        processing_time_ms: elapsed.as_secs_f64() * 1000.0,
    };
    log::debug!(
        "batch rendered {} document(s): {} ok, {} failed in {:.1}ms",
        stats.total,
        stats.succeeded,
        stats.failed,
        stats.processing_time_ms
    );

    BatchProcessingResult { results, stats }
}
