/// Bounded concurrent batch executor.
///
/// Dispatches every batch exactly once onto a small worker pool, waits for
/// all of them, and keeps going when an individual batch fails. The pool
/// stays small to remain under the remote backend's rate and concurrency
/// limits.
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{Mutex as TokioMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::batch::{Batch, partition};
use crate::dataset::Row;
use crate::embedder::{Embedder, embed_or_missing};
use crate::sink::{CsvSink, OutputRow};

/// Shared collaborators for one pipeline run, constructed once in `main`
/// and handed to every worker. There is no global client or sink state.
#[derive(Clone)]
pub struct PipelineContext {
    pub embedder: Arc<dyn Embedder>,
    pub sink: Arc<TokioMutex<CsvSink>>,
    pub batch_size: usize,
    pub max_workers: usize,
}

/// Outcome of a completed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_total: usize,
    pub batches_failed: usize,
    pub rows_written: usize,
}

/// Effective worker-pool size: available parallelism capped by config.
#[must_use]
pub fn worker_count(max_workers: usize) -> usize {
    let cores = thread::available_parallelism().map_or(1, |n| n.get());
    cores.min(max_workers).max(1)
}

/// Run the full pipeline over `rows`: partition, dispatch each batch once,
/// join all of them.
///
/// A failed batch is logged and counted; its rows are absent from the
/// output for this run, and sibling batches are unaffected. The returned
/// summary reflects what actually reached the sink.
pub async fn run(ctx: &PipelineContext, rows: Vec<Row>) -> Result<RunSummary> {
    let batches = partition(rows, ctx.batch_size);
    let total = batches.len();
    let workers = worker_count(ctx.max_workers);
    info!("Dispatching {total} batches across {workers} workers");

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} batches {msg}")
            .expect("valid template")
            .progress_chars("█▓░"),
    );

    let semaphore = Arc::new(Semaphore::new(workers));
    let mut join_set = JoinSet::new();
    for batch in batches {
        let embedder = ctx.embedder.clone();
        let sink = ctx.sink.clone();
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("worker pool semaphore closed")?;
            process_batch(batch, embedder.as_ref(), &sink).await
        });
    }

    let mut summary = RunSummary {
        batches_total: total,
        ..RunSummary::default()
    };
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Ok(written)) => summary.rows_written += written,
            Ok(Err(e)) => {
                summary.batches_failed += 1;
                error!("batch failed, its rows are absent from this run: {e:#}");
            }
            Err(e) => {
                summary.batches_failed += 1;
                error!("batch task aborted: {e}");
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(
        "Run complete: {}/{total} batches ok, {} rows written",
        total - summary.batches_failed,
        summary.rows_written
    );
    Ok(summary)
}

/// Process one batch: a single adapter call for all texts, positional
/// combine, one scoped append to the sink.
async fn process_batch(
    batch: Batch,
    embedder: &dyn Embedder,
    sink: &TokioMutex<CsvSink>,
) -> Result<usize> {
    let index = batch.index;
    let texts: Vec<String> = batch.rows.iter().map(|r| r.text.clone()).collect();
    let embeddings = embed_or_missing(embedder, &texts).await;

    let output: Vec<OutputRow> = batch
        .rows
        .into_iter()
        .zip(embeddings)
        .map(|(row, embedding)| OutputRow { row, embedding })
        .collect();

    // Hold the sink for the whole batch so its rows land as one
    // contiguous, non-interleaved group.
    let mut sink = sink.lock().await;
    sink.append_batch(&output)
        .with_context(|| format!("failed to write batch {index}"))?;
    Ok(output.len())
}

// ── Tests ────────────────────────────────────────────────────────────
