use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A request to invoke a capability by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(alias = "name", alias = "capabilityName")]
    pub capability_name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

impl ExecutionRequest {
    pub fn new(capability_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            capability_name: capability_name.into(),
            arguments,
        }
    }
}

/// Lifecycle state reported with an execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Accepted for processing by a downstream system.
    Pending,
    /// Computed synchronously; `data` holds the answer.
    Completed,
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: Uuid,
    /// Wall-clock time (UTC) the result was produced.
    pub timestamp: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub data: Value,
}

impl ExecutionResult {
    /// A fresh pending record carrying `data`.
    pub fn pending(data: Value) -> Self {
        Self::stamped(ExecutionStatus::Pending, data)
    }

    /// A fresh completed record carrying `data`.
    pub fn completed(data: Value) -> Self {
        Self::stamped(ExecutionStatus::Completed, data)
    }

    fn stamped(status: ExecutionStatus, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            status,
            data,
        }
    }
}
