use crate::stats::CacheStats;
use crate::ttl::TtlCache;
use capgate_model::{CapabilityDescriptor, CapabilitySchema, Identity, SchemaError, SchemaResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Everything built for one identity: the compiled fields, the dynamic
/// descriptor and the listing the identity is shown.
#[derive(Debug, Clone)]
pub struct CompiledCapabilities {
    schema: CapabilitySchema,
    descriptor: Arc<CapabilityDescriptor>,
    listing: Vec<Arc<CapabilityDescriptor>>,
}

impl CompiledCapabilities {
    /// Merge the dynamic descriptor after `statics`. A dynamic descriptor
    /// whose name is already taken by a static one is left out of the listing.
    pub fn new(
        schema: CapabilitySchema,
        descriptor: CapabilityDescriptor,
        statics: &[Arc<CapabilityDescriptor>],
    ) -> Self {
        let descriptor = Arc::new(descriptor);
        let mut listing: Vec<Arc<CapabilityDescriptor>> = statics.to_vec();
        if statics.iter().any(|s| s.name() == descriptor.name()) {
            warn!(
                capability = descriptor.name(),
                "Dynamic capability shadows a static one, omitted from listing"
            );
        } else {
            listing.push(Arc::clone(&descriptor));
        }
        Self {
            schema,
            descriptor,
            listing,
        }
    }

    pub fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    pub fn descriptor(&self) -> &Arc<CapabilityDescriptor> {
        &self.descriptor
    }

    pub fn listing(&self) -> &[Arc<CapabilityDescriptor>] {
        &self.listing
    }

    /// Whether the dynamic descriptor made it into the listing.
    pub fn is_listed(&self) -> bool {
        self.listing.iter().any(|d| Arc::ptr_eq(d, &self.descriptor))
    }
}

/// Compiled capabilities per identity.
pub struct CapabilityCache {
    cache: TtlCache<Arc<CompiledCapabilities>, SchemaError>,
}

impl CapabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    /// Return the cached build for `identity`, running `build` on a miss.
    /// Concurrent misses for the same identity share one build.
    pub async fn get_or_build<F, Fut>(
        &self,
        identity: &Identity,
        build: F,
    ) -> SchemaResult<Arc<CompiledCapabilities>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = SchemaResult<CompiledCapabilities>> + Send + 'static,
    {
        self.cache
            .get_or_load(identity, move || {
                let pending = build();
                async move { pending.await.map(Arc::new) }
            })
            .await
    }

    pub fn peek(&self, identity: &Identity) -> Option<Arc<CompiledCapabilities>> {
        self.cache.peek(identity)
    }

    pub fn invalidate(&self, identity: &Identity) -> bool {
        self.cache.invalidate(identity)
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
