//! Error types for the gateway.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a set of arguments was refused. Checks run in this order: missing
/// required arguments, then value types, then unknown arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required arguments: {}", missing.join(", "))]
    MissingRequired { missing: Vec<String> },

    #[error("argument '{field}' must be {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("unknown arguments: {}", fields.join(", "))]
    UnknownArguments { fields: Vec<String> },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("capability not found: {name}")]
    NotFound { name: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Logged with detail where it happens; callers only see that it failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Whether the caller can fix the request and retry.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
