/// Embedder trait and shared types for text embedding.
///
/// The remote backend is the normal production implementation; the mock
/// exists for tests and offline runs. Failure-to-sentinel substitution
/// lives in [`embed_or_missing`], not in the implementations themselves.
pub mod mock;
pub mod remote;

use std::{future::Future, pin::Pin};

use thiserror::Error;
use tracing::error;

/// Boxed future type used by the dyn-compatible async trait below.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response shape mismatch: {0}")]
    Shape(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`. Embedding is async because real backends perform HTTP
/// requests.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts in one backend call.
    ///
    /// On success returns exactly one vector per input, in input order.
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedderError>>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}

/// Per-row embedding outcome.
///
/// `Missing` is a tagged sentinel, distinct from any valid vector, so
/// downstream consumers can tell "embedding absent" from "embedding
/// present but zero" and re-embed gaps selectively.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Vector(Vec<f32>),
    Missing(String),
}

impl Embedding {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Embedding::Missing(_))
    }
}

/// Call the embedder once for a whole batch, degrading to sentinels on
/// failure.
///
/// Availability of row metadata takes priority over completeness of
/// embeddings: a failed call never drops rows and never propagates, it
/// flags every row of the batch as `Missing` and the run continues.
pub async fn embed_or_missing(embedder: &dyn Embedder, texts: &[String]) -> Vec<Embedding> {
    match embedder.embed_batch(texts).await {
        Ok(vectors) => vectors.into_iter().map(Embedding::Vector).collect(),
        Err(e) => {
            error!(
                "embedding call failed, writing sentinels for {} rows: {e}",
                texts.len()
            );
            vec![Embedding::Missing(e.to_string()); texts.len()]
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
