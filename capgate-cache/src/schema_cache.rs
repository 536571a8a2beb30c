use crate::stats::CacheStats;
use crate::ttl::TtlCache;
use capgate_model::{Identity, RawSchema, SchemaError, SchemaFetchError, SchemaResult};
use capgate_source::SchemaSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw schemas per identity, fetched through a [`SchemaSource`].
///
/// Every fetch is bounded by `fetch_timeout`, so a stalled source turns into
/// a [`SchemaFetchError::Timeout`] for all waiters instead of holding the
/// slot forever.
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    cache: TtlCache<Arc<RawSchema>, SchemaError>,
    fetch_timeout: Duration,
}

impl SchemaCache {
    pub fn new(source: Arc<dyn SchemaSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            cache: TtlCache::new(ttl),
            fetch_timeout,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    pub async fn get(&self, identity: &Identity) -> SchemaResult<Arc<RawSchema>> {
        let source = Arc::clone(&self.source);
        let fetch_identity = identity.clone();
        let fetch_timeout = self.fetch_timeout;

        self.cache
            .get_or_load(identity, move || async move {
                debug!(
                    identity = %fetch_identity,
                    source = source.source_name(),
                    "Fetching schema"
                );
                match tokio::time::timeout(fetch_timeout, source.fetch_schema(&fetch_identity))
                    .await
                {
                    Ok(Ok(raw)) => Ok(Arc::new(raw)),
                    Ok(Err(e)) => {
                        warn!(identity = %fetch_identity, error = %e, "Schema fetch failed");
                        Err(e)
                    }
                    Err(_) => {
                        let timeout_ms = u64::try_from(fetch_timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(identity = %fetch_identity, timeout_ms, "Schema fetch timed out");
                        Err(SchemaError::from(SchemaFetchError::Timeout { timeout_ms }))
                    }
                }
            })
            .await
    }

    pub fn peek(&self, identity: &Identity) -> Option<Arc<RawSchema>> {
        self.cache.peek(identity)
    }

    pub fn invalidate(&self, identity: &Identity) -> bool {
        self.cache.invalidate(identity)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
