//! Configuration for the retrieval service.
//!
//! Loaded once at startup (TOML) and shared read-only afterwards.
//! Every field has a default so a minimal file only lists its backends.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::locator::FilenameTemplate;
use crate::domain::BackendKind;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "{workflow_id}/{task_id}/{timestamp}/{try_number}.log";

/// ConfigError is fatal for the request (or for startup).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown template key `{{{0}}}` in filename template")]
    UnknownTemplateKey(String),

    #[error("unterminated placeholder in filename template `{0}`")]
    UnterminatedPlaceholder(String),

    #[error("unbalanced `}}` in filename template `{0}`")]
    UnbalancedBrace(String),

    #[error("no configuration for backend `{0}`")]
    MissingBackend(BackendKind),

    #[error("backend `{0}` is configured more than once")]
    DuplicateBackend(BackendKind),

    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Path template shared by all backends.
    pub filename_template: String,

    /// Also resolve a "latest" alias location for the newest try.
    pub latest_alias: bool,

    /// Overall per-request deadline.
    pub request_timeout_ms: u64,

    /// Upper bound on bytes returned per chunk.
    pub max_chunk_bytes: u64,

    pub retry: RetryConfig,

    /// Backends in priority order.
    pub backends: Vec<BackendConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            latest_alias: false,
            request_timeout_ms: 30_000,
            max_chunk_bytes: 10 * 1024 * 1024,
            retry: RetryConfig::default(),
            backends: vec![BackendConfig::new(BackendKind::Local, "logs")],
        }
    }
}

/// Bounded retry for retryable `Unreachable` fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per location (including the first).
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    /// Random extra delay, as a fraction of the computed delay (0.0 disables).
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

/// One storage backend.
///
/// `base` depends on the kind:
/// - local: base directory
/// - remote_host: base URL of the worker's log server
/// - archive: blob store root (keys are `prefix/<rendered template>`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_timeout_ms() -> u64 {
    5_000
}

impl BackendConfig {
    pub fn new(kind: BackendKind, base: impl Into<String>) -> Self {
        Self {
            kind,
            base: base.into(),
            prefix: None,
            timeout_ms: default_backend_timeout_ms(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LogConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: LogConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        FilenameTemplate::parse(&self.filename_template)?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_chunk_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_chunk_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.multiplier",
                reason: format!("must be a finite number >= 1.0, got {}", self.retry.multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::InvalidValue {
                field: "retry.jitter",
                reason: "must be within 0.0..=1.0".to_string(),
            });
        }

        let mut seen = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            if seen.contains(&backend.kind) {
                return Err(ConfigError::DuplicateBackend(backend.kind));
            }
            seen.push(backend.kind);

            if backend.kind == BackendKind::RemoteHost {
                reqwest::Url::parse(&backend.base).map_err(|e| ConfigError::InvalidBaseUrl {
                    url: backend.base.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.kind == kind)
    }

    /// Configured kinds in priority order.
    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind).collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
