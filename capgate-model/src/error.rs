//! Error taxonomy for schema fetching and compilation.
//!
//! All types are `Clone` because a single failed load is handed to every
//! caller waiting on the same in-flight slot.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// The schema source could not deliver a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaFetchError {
    /// Connection refused, DNS failure, TLS failure, reset, ...
    #[error("schema source unreachable: {0}")]
    Unreachable(String),

    /// The source answered with a non-2xx status.
    #[error("schema source returned HTTP {status}")]
    NonSuccess { status: u16 },

    #[error("schema fetch timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// The schema payload is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed schema: {0}")]
pub struct SchemaMalformedError(pub String);

impl SchemaMalformedError {
    /// A field record at `index` has no usable name.
    pub fn missing_name(index: usize) -> Self {
        Self(format!("field record #{index} has no name"))
    }
}

/// Any failure on the fetch → build path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Fetch(#[from] SchemaFetchError),

    #[error(transparent)]
    Malformed(#[from] SchemaMalformedError),

    /// The load itself failed unexpectedly (panicked or was torn down).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchemaError {
    pub fn is_fetch(&self) -> bool {
        matches!(self, SchemaError::Fetch(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, SchemaError::Malformed(_))
    }

    /// Returns true if the fetch failed because the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SchemaError::Fetch(SchemaFetchError::Timeout { .. }))
    }
}
