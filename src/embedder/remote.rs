/// Remote embedding client over HTTP.
///
/// Wraps the backend's embed-text endpoint with an explicit per-request
/// timeout and transport-level retry with exponential backoff for
/// rate-limit and server errors. Callers get either a full set of vectors
/// or an error; the failure-to-sentinel policy lives in
/// [`super::embed_or_missing`], not here.
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BoxFuture, Embedder, EmbedderError};
use crate::config::Config;

/// Environment variable holding the bearer token for the backend.
pub const API_KEY_ENV: &str = "EMBED_API_KEY";

/// Input mode hint sent with each request. Corpus rows are embedded as
/// documents; query-time callers embed with `Query` so the backend can
/// apply its asymmetric encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Document,
    Query,
}

impl InputMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Document => "document",
            InputMode::Query => "query",
        }
    }
}

/// Async embeddings client for the remote backend.
#[derive(Clone)]
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    context_id: String,
    mode: InputMode,
    dimensions: usize,
    max_retries: usize,
    retry_base_delay: Duration,
}

impl RemoteEmbedder {
    /// Build a client from validated configuration.
    ///
    /// Reads the optional bearer token from `EMBED_API_KEY`; deployments
    /// that authenticate at the network layer may leave it unset.
    pub fn from_config(config: &Config) -> Result<Self> {
        let context_id = config
            .context_id
            .clone()
            .context("context_id missing; run Config::validate before building the client")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid EMBED_API_KEY value")?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            model_id: config.model.id.clone(),
            context_id,
            mode: InputMode::Document,
            dimensions: config.model.dimensions,
            max_retries: config.backend.max_retries,
            retry_base_delay: Duration::from_millis(config.backend.retry_base_delay_ms),
        })
    }

    /// Switch the input mode (documents by default).
    #[must_use]
    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }

    fn check_shape(
        &self,
        embeddings: Vec<Vec<f32>>,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if embeddings.len() != expected {
            return Err(EmbedderError::Shape(format!(
                "backend returned {} embeddings for {expected} inputs",
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(EmbedderError::Shape(format!(
                "expected {}-dim vectors, got {}",
                self.dimensions,
                bad.len()
            )));
        }
        Ok(embeddings)
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.retry_base_delay * (1u32 << capped)
    }
}

impl Embedder for RemoteEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedderError>> {
        Box::pin(async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = EmbedRequest {
                inputs: texts,
                model_id: &self.model_id,
                mode: self.mode.as_str(),
                context_id: &self.context_id,
            };

            let mut attempt = 0usize;
            loop {
                let response = self.client.post(&self.endpoint).json(&request).send().await;
                match response {
                    Ok(resp) => {
                        let status = resp.status();
                        if status.is_success() {
                            let parsed: EmbedResponse = resp.json().await?;
                            debug!("embedded batch of {} texts", texts.len());
                            return self.check_shape(parsed.embeddings, texts.len());
                        }

                        let body = resp
                            .text()
                            .await
                            .unwrap_or_else(|_| "<body unavailable>".to_string());
                        if should_retry_status(status) && attempt + 1 < self.max_retries {
                            attempt += 1;
                            let delay = self.backoff(attempt);
                            warn!(
                                "backend returned {status}, retrying in {delay:?} \
                                 (attempt {attempt}/{})",
                                self.max_retries
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(EmbedderError::Status { status, body });
                    }
                    Err(err) => {
                        if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                            attempt += 1;
                            let delay = self.backoff(attempt);
                            warn!(
                                "request error {err}, retrying in {delay:?} \
                                 (attempt {attempt}/{})",
                                self.max_retries
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(err.into());
                    }
                }
            }
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    model_id: &'a str,
    mode: &'a str,
    context_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

// ── Tests ────────────────────────────────────────────────────────────
