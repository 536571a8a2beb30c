//! Schema source abstraction trait.

use async_trait::async_trait;
use capgate_model::{Identity, RawSchema, SchemaResult};

/// Fetches the raw permission schema of one identity.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Returns a short name of the source, for logs.
    fn source_name(&self) -> &'static str;

    /// Fetches the schema for `identity`.
    ///
    /// Fails with `SchemaError::Fetch` when the source cannot be reached,
    /// answers with a non-success status or times out, and with
    /// `SchemaError::Malformed` when the body cannot be decoded.
    async fn fetch_schema(&self, identity: &Identity) -> SchemaResult<RawSchema>;
}
