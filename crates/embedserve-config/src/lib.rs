//! Centralized configuration management for embedserve
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Optional TOML file
//! 3. Environment variable overrides
//! 4. Runtime validation

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use source::{ConfigurationLoader, ConfigurationSource, EnvironmentSource, TomlFileSource};
pub use validation::Validate;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

// Embedding Model Configuration
const DEFAULT_EMBEDDING_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_EMBEDDING_MODEL_MAX_TOKENS: usize = 256; // sentence-transformers max_seq_length

// Request limits
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;
const DEFAULT_MAX_TEXTS_PER_REQUEST: usize = 1000;
const DEFAULT_EMBEDDING_USE_GPU: bool = true;

// API Server Configuration
const DEFAULT_API_HOST: &str = "0.0.0.0";
const DEFAULT_API_PORT: u16 = 8001;
const DEFAULT_API_ENABLE_CORS: bool = true;
const DEFAULT_API_ENABLE_DOCS: bool = true;
const DEFAULT_API_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// Telemetry Configuration
const DEFAULT_TRACING_LEVEL: &str = "info";
const DEFAULT_JSON_LOGS: bool = false;
const DEFAULT_ENABLE_METRICS: bool = false;
const DEFAULT_METRICS_PORT: u16 = 9001;
const DEFAULT_SERVICE_NAME: &str = "embedserve";

/// GPU device names accepted in `performance.gpu_device`
pub const GPU_DEVICE_CHOICES: [&str; 4] = ["mps", "metal", "cuda", "cpu"];

const TRACING_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Read and parse an environment variable, ignoring unset or unparsable values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Core configuration for the embedding server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Model and request-limit configuration
    pub embedding: EmbeddingConfig,

    /// HTTP server configuration
    pub api: ApiConfig,

    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which pretrained model to load
    pub model: ModelConfig,

    /// Device and batching behaviour
    pub performance: PerformanceConfig,

    /// Where downloaded model files live
    pub cache: CacheConfig,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face model identifier (e.g. "sentence-transformers/all-MiniLM-L6-v2")
    pub id: String,

    /// Inputs longer than this many tokens are truncated before inference
    pub max_tokens: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_EMBEDDING_MODEL_ID.to_string(),
            max_tokens: DEFAULT_EMBEDDING_MODEL_MAX_TOKENS,
        }
    }
}

impl ModelConfig {
    /// Short model name reported to clients ("all-MiniLM-L6-v2")
    pub fn display_name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

/// Performance and request-limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Batch size hint applied when a request does not send one
    pub default_batch_size: usize,

    /// Largest accepted `texts` array on the batch endpoint
    pub max_texts_per_request: usize,

    /// Whether GPU backends are probed at all
    pub use_gpu: bool,

    /// Backend to probe first ("mps", "metal", "cuda" or "cpu")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_device: Option<String>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            default_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_texts_per_request: DEFAULT_MAX_TEXTS_PER_REQUEST,
            use_gpu: DEFAULT_EMBEDDING_USE_GPU,
            gpu_device: None,
        }
    }
}

/// Cache configuration for downloaded model files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory; `None` uses the hf-hub default (`~/.cache/huggingface/hub`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl CacheConfig {
    /// Resolved cache directory, if one was configured
    pub fn resolved_dir(&self) -> Option<std::path::PathBuf> {
        self.dir.as_deref().map(|dir| {
            dir.strip_prefix("~/").map_or_else(
                || std::path::PathBuf::from(dir),
                |rest| {
                    dirs::home_dir()
                        .unwrap_or_else(|| std::path::PathBuf::from("."))
                        .join(rest)
                },
            )
        })
    }
}

impl EmbeddingConfig {
    /// Overwrite fields whose `EMBEDSERVE_EMBEDDING_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(id) = env_string("EMBEDSERVE_EMBEDDING_MODEL") {
            self.model.id = id;
        }
        if let Some(max_tokens) = env_parse("EMBEDSERVE_EMBEDDING_MAX_TOKENS") {
            self.model.max_tokens = max_tokens;
        }
        if let Some(batch_size) = env_parse("EMBEDSERVE_EMBEDDING_DEFAULT_BATCH_SIZE") {
            self.performance.default_batch_size = batch_size;
        }
        if let Some(max_texts) = env_parse("EMBEDSERVE_EMBEDDING_MAX_TEXTS_PER_REQUEST") {
            self.performance.max_texts_per_request = max_texts;
        }
        if let Some(use_gpu) = env_parse("EMBEDSERVE_EMBEDDING_USE_GPU") {
            self.performance.use_gpu = use_gpu;
        }
        if let Some(device) = env_string("EMBEDSERVE_EMBEDDING_GPU_DEVICE") {
            self.performance.gpu_device = Some(device);
        }
        if let Some(dir) = env_string("EMBEDSERVE_EMBEDDING_CACHE_DIR") {
            self.cache.dir = Some(dir);
        }
    }
}

impl validation::Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.model.id, "model.id")?;
        validation::validate_range(self.model.max_tokens as u64, 1, 8192, "model.max_tokens")?;
        validation::validate_range(
            self.performance.default_batch_size as u64,
            1,
            1024,
            "performance.default_batch_size",
        )?;
        validation::validate_range(
            self.performance.max_texts_per_request as u64,
            1,
            100_000,
            "performance.max_texts_per_request",
        )?;
        if let Some(device) = &self.performance.gpu_device {
            validation::validate_one_of(device, &GPU_DEVICE_CHOICES, "performance.gpu_device")?;
        }
        Ok(())
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Attach a permissive CORS layer
    pub enable_cors: bool,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`
    pub enable_docs: bool,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            port: DEFAULT_API_PORT,
            enable_cors: DEFAULT_API_ENABLE_CORS,
            enable_docs: DEFAULT_API_ENABLE_DOCS,
            max_body_bytes: DEFAULT_API_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    /// Overwrite fields whose `EMBEDSERVE_API_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = env_string("EMBEDSERVE_API_HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse("EMBEDSERVE_API_PORT") {
            self.port = port;
        }
        if let Some(enable_cors) = env_parse("EMBEDSERVE_API_ENABLE_CORS") {
            self.enable_cors = enable_cors;
        }
        if let Some(enable_docs) = env_parse("EMBEDSERVE_API_ENABLE_DOCS") {
            self.enable_docs = enable_docs;
        }
        if let Some(max_body_bytes) = env_parse("EMBEDSERVE_API_MAX_BODY_BYTES") {
            self.max_body_bytes = max_body_bytes;
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl validation::Validate for ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.host, "api.host")?;
        validation::validate_port(self.port, "api.port")?;
        validation::validate_range(
            self.max_body_bytes as u64,
            1024,
            1024 * 1024 * 1024,
            "api.max_body_bytes",
        )?;
        Ok(())
    }
}

/// Telemetry and observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Tracing level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub tracing_level: String,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Install the Prometheus exporter
    pub enable_metrics: bool,

    /// Port the Prometheus exporter listens on
    pub metrics_port: u16,

    /// Service name attached to startup logs
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tracing_level: DEFAULT_TRACING_LEVEL.to_string(),
            json_logs: DEFAULT_JSON_LOGS,
            enable_metrics: DEFAULT_ENABLE_METRICS,
            metrics_port: DEFAULT_METRICS_PORT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Overwrite fields whose `EMBEDSERVE_TELEMETRY_*` variable is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(level) = env_string("EMBEDSERVE_TELEMETRY_TRACING_LEVEL") {
            self.tracing_level = level;
        }
        if let Some(json_logs) = env_parse("EMBEDSERVE_TELEMETRY_JSON_LOGS") {
            self.json_logs = json_logs;
        }
        if let Some(enable_metrics) = env_parse("EMBEDSERVE_TELEMETRY_ENABLE_METRICS") {
            self.enable_metrics = enable_metrics;
        }
        if let Some(metrics_port) = env_parse("EMBEDSERVE_TELEMETRY_METRICS_PORT") {
            self.metrics_port = metrics_port;
        }
        if let Some(service_name) = env_string("EMBEDSERVE_TELEMETRY_SERVICE_NAME") {
            self.service_name = service_name;
        }
    }
}

impl validation::Validate for TelemetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.service_name, "telemetry.service_name")?;
        validation::validate_one_of(&self.tracing_level, &TRACING_LEVELS, "telemetry.tracing_level")?;
        if self.enable_metrics {
            validation::validate_port(self.metrics_port, "telemetry.metrics_port")?;
        }
        Ok(())
    }
}

impl ApplicationConfig {
    /// Apply every `EMBEDSERVE_*` override on top of the current values
    pub fn apply_env_overrides(&mut self) {
        self.embedding.apply_env_overrides();
        self.api.apply_env_overrides();
        self.telemetry.apply_env_overrides();
    }
}

impl validation::Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.embedding.validate()?;
        self.api.validate()?;
        self.telemetry.validate()?;

        // The metrics exporter and the API cannot share a port
        if self.telemetry.enable_metrics && self.telemetry.metrics_port == self.api.port {
            return Err(ConfigError::InvalidPort {
                port: self.telemetry.metrics_port,
            });
        }

        Ok(())
    }
}
