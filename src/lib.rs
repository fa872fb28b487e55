//! # WikiEmbed — Bulk Embedding Pipeline
//!
//! Converts Japanese Wikipedia passages into dense 1024-dim vector
//! embeddings via a remote embedding service and accumulates them into a
//! single append-only CSV for later vector-store ingestion.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, env overrides
//! - **[`dataset`]** — JSONL corpus reader (full or index range)
//! - **[`batch`]** — Fixed-size contiguous batch partitioning
//! - **[`embedder`]** — Remote embedding client, mock, failure sentinels
//! - **[`sink`]** — Append-only CSV sink shared across workers
//! - **[`pipeline`]** — Bounded concurrent executor with join-all semantics

pub mod batch;
pub mod config;
pub mod dataset;
pub mod embedder;
pub mod pipeline;
pub mod sink;
