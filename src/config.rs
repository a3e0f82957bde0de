//! Process configuration.
//!
//! Built once in `main` from the environment and passed through explicitly;
//! the controller holds no process-wide mutable state.

use std::env;
use std::sync::Arc;

use thiserror::Error;

use crate::metadata::{HttpMetadataFetcher, MetadataFetcher};
use crate::review::{BlockingStrategy, LoggingStrategy, ViolationStrategy};

/// Environment variable selecting the violation strategy: `log` or `block`.
pub const VIOLATION_MODE_ENV: &str = "VIOLATION_MODE";
/// Environment variable naming the metadata backend. Only `http` is built in.
pub const METADATA_BACKEND_ENV: &str = "METADATA_BACKEND";
/// Environment variable with the metadata service base URL.
pub const METADATA_SERVICE_URL_ENV: &str = "METADATA_SERVICE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized violation mode {0:?}, expected \"log\" or \"block\"")]
    UnknownViolationMode(String),

    #[error("unsupported metadata backend {0:?}")]
    UnknownBackend(String),

    #[error("{0} must be set")]
    MissingVar(&'static str),
}

/// How accumulated violations are enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViolationMode {
    /// Log violations, admit the workload.
    #[default]
    LogOnly,
    /// Deny the workload on the first enforcing violation.
    Block,
}

impl ViolationMode {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "log" | "log-only" => Ok(ViolationMode::LogOnly),
            "block" => Ok(ViolationMode::Block),
            other => Err(ConfigError::UnknownViolationMode(other.to_string())),
        }
    }

    pub fn strategy(self) -> Arc<dyn ViolationStrategy> {
        match self {
            ViolationMode::LogOnly => Arc::new(LoggingStrategy),
            ViolationMode::Block => Arc::new(BlockingStrategy),
        }
    }
}

/// The configured metadata backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataBackend {
    Http { base_url: String },
}

impl MetadataBackend {
    pub fn fetcher(&self) -> Arc<dyn MetadataFetcher> {
        match self {
            MetadataBackend::Http { base_url } => Arc::new(HttpMetadataFetcher::new(base_url)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub violation_mode: ViolationMode,
    pub metadata_backend: MetadataBackend,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            env::var(VIOLATION_MODE_ENV).ok().as_deref(),
            env::var(METADATA_BACKEND_ENV).ok().as_deref(),
            env::var(METADATA_SERVICE_URL_ENV).ok().as_deref(),
        )
    }

    fn from_vars(
        mode: Option<&str>,
        backend: Option<&str>,
        metadata_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let violation_mode = match mode {
            Some(s) => ViolationMode::parse(s)?,
            None => ViolationMode::default(),
        };
        let metadata_backend = match backend.unwrap_or("http") {
            "http" => MetadataBackend::Http {
                base_url: metadata_url
                    .ok_or(ConfigError::MissingVar(METADATA_SERVICE_URL_ENV))?
                    .to_string(),
            },
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };
        Ok(Self {
            violation_mode,
            metadata_backend,
        })
    }
}
