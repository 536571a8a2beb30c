//! In-memory schema source.

use crate::source::SchemaSource;
use async_trait::async_trait;
use capgate_model::{Identity, RawSchema, SchemaFetchError, SchemaResult};
use std::collections::HashMap;

/// Serves fixed schemas keyed by identity.
///
/// Identities without a schema get the fallback schema if one is set, and
/// otherwise fail like a `404` from the HTTP source.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    schemas: HashMap<String, RawSchema>,
    fallback: Option<RawSchema>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the schema served for `identity`.
    pub fn with_schema(mut self, identity: &str, schema: RawSchema) -> Self {
        self.schemas.insert(identity.to_string(), schema);
        self
    }

    /// Sets the schema served for unregistered identities.
    pub fn with_fallback(mut self, schema: RawSchema) -> Self {
        self.fallback = Some(schema);
        self
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_schema(&self, identity: &Identity) -> SchemaResult<RawSchema> {
        self.schemas
            .get(identity.as_str())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| SchemaFetchError::NonSuccess { status: 404 }.into())
    }
}
