//! Form-schema API client.
//!
//! Issues `GET <url>` with the caller identity as bearer token and decodes
//! the `fieldList` payload.

use crate::source::SchemaSource;
use async_trait::async_trait;
use capgate_model::{
    Identity, RawSchema, SchemaFetchError, SchemaMalformedError, SchemaResult,
};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration of the HTTP schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSourceConfig {
    /// Full URL of the form-schema endpoint.
    pub url: String,
    /// Per-request deadline (ms), connect included.
    pub timeout_ms: u64,
}

impl Default for SchemaSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/api/module/request/form".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl SchemaSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Schema source backed by the form-schema HTTP API.
pub struct HttpSchemaSource {
    config: SchemaSourceConfig,
    client: Client,
}

impl HttpSchemaSource {
    /// Creates a new source. Fails only if the TLS backend cannot be
    /// initialized.
    pub fn new(config: SchemaSourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SchemaSourceConfig {
        &self.config
    }

    fn classify(&self, err: reqwest::Error) -> SchemaFetchError {
        if err.is_timeout() {
            SchemaFetchError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            SchemaFetchError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    fn source_name(&self) -> &'static str {
        "form-schema API"
    }

    async fn fetch_schema(&self, identity: &Identity) -> SchemaResult<RawSchema> {
        debug!(identity = %identity, url = %self.config.url, "Fetching schema");

        let response = self
            .client
            .get(&self.config.url)
            .bearer_auth(identity.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(identity = %identity, status = status.as_u16(), "Schema source rejected request");
            return Err(SchemaFetchError::NonSuccess {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let raw: RawSchema = serde_json::from_slice(&body)
            .map_err(|e| SchemaMalformedError(format!("undecodable schema body: {e}")))?;

        debug!(identity = %identity, fields = raw.fields.len(), "Fetched schema");
        Ok(raw)
    }
}
