/// Configuration module for the embedding pipeline.
///
/// Handles loading, validating, and providing default configuration values,
/// plus environment overrides for the tenant identifier and service region.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_input_path() -> String {
    "./data/passages.jsonl".to_string()
}

fn default_batch_size() -> usize {
    96
}

fn default_max_workers() -> usize {
    2
}

fn default_model_id() -> String {
    "cohere.embed-multilingual-v3.0".to_string()
}

fn default_dimensions() -> usize {
    1024
}

fn default_region() -> String {
    "us-chicago-1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// JSONL corpus snapshot to embed.
    #[serde(default = "default_input_path")]
    pub input_path: String,

    /// Output CSV path. Defaults to a dated filename when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Rows per embedding call. The backend bills and limits per call, so
    /// one batch is one network round trip.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on concurrent embedding calls. Kept small to stay under
    /// the backend's rate and concurrency limits.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Tenant identifier sent with every embedding request. Required;
    /// may also be supplied via the CONTEXT_ID environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub id: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Service region used to derive the endpoint when none is given.
    /// May also be supplied via the REGION environment variable.
    #[serde(default = "default_region")]
    pub region: String,

    /// Full endpoint override; takes precedence over `region`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Explicit per-request deadline, independent of retry backoff.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: None,
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            context_id: None,
            model: ModelConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            dimensions: default_dimensions(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file. Environment overrides are applied last.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        // Check if config file exists
        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let mut cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            cfg.apply_env();
            return Ok(cfg);
        }

        // Read existing config
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        // Parse with defaults
        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                Self::default()
            }
        };

        info!("Loaded configuration from {path}");

        cfg.apply_env();
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Apply environment overrides for values that usually live outside the
    /// config file (tenant identifier, deployment region).
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("CONTEXT_ID") {
            if !v.is_empty() {
                self.context_id = Some(v);
            }
        }
        if let Ok(v) = std::env::var("REGION") {
            if !v.is_empty() {
                self.backend.region = v;
            }
        }
    }

    /// Validate configuration values.
    ///
    /// A failure here is fatal at startup: nothing is scheduled and no
    /// output file is created until validation passes.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.max_workers > 0, "max_workers must be positive");
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(!self.model.id.is_empty(), "model.id must not be empty");
        anyhow::ensure!(
            self.context_id.as_deref().is_some_and(|s| !s.is_empty()),
            "context_id must be set (config file or CONTEXT_ID environment variable)"
        );
        Ok(())
    }

    /// Resolved output path: explicit config value, or a dated default so
    /// successive runs never clobber each other.
    #[must_use]
    pub fn output_path(&self) -> String {
        self.output_path.clone().unwrap_or_else(|| {
            format!(
                "wiki_ja_embeddings_{}.csv",
                chrono::Local::now().format("%Y-%m-%d")
            )
        })
    }

    /// Resolved backend endpoint: explicit override, or derived from region.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.backend.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://inference.generativeai.{}.oci.oraclecloud.com/20231130/actions/embedText",
                self.backend.region
            )
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
