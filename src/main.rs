use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wikiembed::config::Config;
use wikiembed::dataset;
use wikiembed::embedder::Embedder;
use wikiembed::embedder::remote::RemoteEmbedder;
use wikiembed::pipeline::{self, PipelineContext};
use wikiembed::sink::CsvSink;

/// Bulk-embed a Japanese Wikipedia passage corpus into CSV.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the input JSONL corpus path
    #[arg(long)]
    input: Option<String>,

    /// Override the output CSV path
    #[arg(long)]
    output: Option<String>,

    /// Skip this many corpus rows before batching
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Process at most this many rows
    #[arg(long)]
    limit: Option<usize>,

    /// Partition and count batches without calling the backend
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output) = args.output {
        config.output_path = Some(output);
    }

    // Fatal before any batch is scheduled or the output header is written.
    config.validate().context("invalid configuration")?;

    let rows = dataset::load_rows_range(&config.input_path, args.offset, args.limit)?;
    let batch_count = rows.len().div_ceil(config.batch_size);

    if args.dry_run {
        info!(
            "Dry run: {} rows -> {batch_count} batches of up to {}",
            rows.len(),
            config.batch_size
        );
        return Ok(());
    }

    let embedder: Arc<dyn Embedder> = Arc::new(RemoteEmbedder::from_config(&config)?);
    let output_path = config.output_path();
    let sink = CsvSink::create(&output_path)?;

    let ctx = PipelineContext {
        embedder,
        sink: Arc::new(TokioMutex::new(sink)),
        batch_size: config.batch_size,
        max_workers: config.max_workers,
    };

    let summary = pipeline::run(&ctx, rows).await?;
    if summary.batches_failed > 0 {
        warn!(
            "{} of {} batches failed; their rows are missing from {output_path} for this run",
            summary.batches_failed, summary.batches_total
        );
    }
    info!("Wrote {} rows to {output_path}", summary.rows_written);

    Ok(())
}
