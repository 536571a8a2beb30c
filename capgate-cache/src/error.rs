//! Cache error types.

use capgate_model::SchemaError;
use thiserror::Error;

/// A load ended without producing a result (it panicked or its task was
/// cancelled by runtime shutdown). Waiters receive this instead of hanging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache load aborted: {0}")]
pub struct LoadAborted(pub String);

impl LoadAborted {
    pub(crate) fn panicked() -> Self {
        Self("load panicked".to_string())
    }
}

impl From<LoadAborted> for SchemaError {
    fn from(err: LoadAborted) -> Self {
        SchemaError::Internal(err.to_string())
    }
}
