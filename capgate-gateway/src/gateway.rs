//! Listing and invocation entry points.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::{BearerTokenExtractor, IdentityExtractor};
use crate::router::{CapabilityHandler, ExecutionRouter, InvocationContext};
use crate::statics::{register_static_handlers, static_descriptors};
use capgate_cache::{CacheStats, CapabilityCache, CompiledCapabilities, SchemaCache};
use capgate_model::{
    CapabilityBuilder, CapabilityDescriptor, ExecutionRequest, ExecutionResult, Identity,
    SchemaError, SchemaResult,
};
use capgate_source::SchemaSource;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Statistics of both caches, for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayCacheStats {
    pub schema: CacheStats,
    pub capability: CacheStats,
}

/// Everything the gateway shares across requests: both caches, the builder,
/// the static capabilities and the router. Built once at startup.
pub struct GatewayContext {
    schemas: Arc<SchemaCache>,
    capabilities: CapabilityCache,
    builder: Arc<CapabilityBuilder>,
    statics: Arc<[Arc<CapabilityDescriptor>]>,
    router: ExecutionRouter,
}

impl GatewayContext {
    pub fn new(source: Arc<dyn SchemaSource>, config: &GatewayConfig) -> Self {
        let mut router = ExecutionRouter::new(config.router.unknown_arguments);
        register_static_handlers(&mut router);

        info!(
            source = source.source_name(),
            schema_ttl_secs = config.cache.schema_ttl_secs,
            capability_ttl_secs = config.cache.capability_ttl_secs,
            capability = %config.capability.name,
            "Creating gateway context"
        );

        Self {
            schemas: Arc::new(SchemaCache::new(
                source,
                config.cache.schema_ttl(),
                config.schema_source.timeout(),
            )),
            capabilities: CapabilityCache::new(config.cache.capability_ttl()),
            builder: Arc::new(CapabilityBuilder::new(
                config.capability.name.clone(),
                config.capability.description.clone(),
            )),
            statics: static_descriptors().into(),
            router,
        }
    }

    /// Routes `name` to a custom handler. Register before serving requests.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn CapabilityHandler>) {
        self.router.register_handler(name, handler);
    }

    pub fn statics(&self) -> &[Arc<CapabilityDescriptor>] {
        &self.statics
    }

    pub fn router(&self) -> &ExecutionRouter {
        &self.router
    }

    /// The compiled capabilities for `identity`, built through both caches.
    async fn compiled(&self, identity: &Identity) -> SchemaResult<Arc<CompiledCapabilities>> {
        let schemas = Arc::clone(&self.schemas);
        let builder = Arc::clone(&self.builder);
        let statics = Arc::clone(&self.statics);
        let build_identity = identity.clone();

        self.capabilities
            .get_or_build(identity, move || async move {
                let raw = schemas.get(&build_identity).await?;
                let schema = builder.compile_schema(&raw, Utc::now())?;
                let descriptor = builder.build_from_fields(schema.fields());
                info!(
                    identity = %build_identity,
                    fields = schema.len(),
                    parameters = descriptor.parameters().len(),
                    "Built capabilities"
                );
                Ok::<_, SchemaError>(CompiledCapabilities::new(schema, descriptor, &statics))
            })
            .await
    }
}

/// The gateway: lists and invokes capabilities on behalf of callers.
pub struct Gateway {
    context: GatewayContext,
    extractor: Arc<dyn IdentityExtractor>,
}

impl Gateway {
    pub fn new(context: GatewayContext) -> Self {
        Self {
            context,
            extractor: Arc::new(BearerTokenExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IdentityExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }

    pub fn identify(&self, credential: Option<&str>) -> Option<Identity> {
        self.extractor.extract(credential)
    }

    /// Lists the capabilities for the caller presenting `credential`.
    pub async fn list(&self, credential: Option<&str>) -> Vec<Arc<CapabilityDescriptor>> {
        self.list_for(self.identify(credential).as_ref()).await
    }

    /// Static capabilities first, then the caller's dynamic one. Never fails:
    /// without an identity, or when the schema cannot be fetched or compiled,
    /// only the static capabilities are listed.
    pub async fn list_for(&self, identity: Option<&Identity>) -> Vec<Arc<CapabilityDescriptor>> {
        let Some(identity) = identity else {
            debug!("No identity, listing static capabilities");
            return self.context.statics.to_vec();
        };
        match self.context.compiled(identity).await {
            Ok(compiled) => compiled.listing().to_vec(),
            Err(e) => {
                warn!(
                    identity = %identity,
                    error = %e,
                    "Schema unavailable, listing static capabilities only"
                );
                self.context.statics.to_vec()
            }
        }
    }

    /// Invokes a capability for the caller presenting `credential`.
    pub async fn invoke(
        &self,
        credential: Option<&str>,
        request: ExecutionRequest,
    ) -> GatewayResult<ExecutionResult> {
        self.invoke_as(self.identify(credential).as_ref(), request).await
    }

    /// Resolves the capability (static table first, then the caller's dynamic
    /// descriptor) and runs it through the router.
    pub async fn invoke_as(
        &self,
        identity: Option<&Identity>,
        request: ExecutionRequest,
    ) -> GatewayResult<ExecutionResult> {
        let ExecutionRequest {
            capability_name: name,
            arguments,
        } = request;

        let result = match self.resolve(identity, &name).await {
            Ok(Some(descriptor)) => {
                let invocation = InvocationContext::new(&name, identity);
                self.context.router.execute(invocation, arguments, &descriptor).await
            }
            Ok(None) => Err(GatewayError::not_found(&name)),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => debug!(capability = %name, "Capability invoked"),
            Err(GatewayError::Internal(detail)) => {
                error!(capability = %name, detail = %detail, "Capability failed");
            }
            Err(e) => debug!(capability = %name, error = %e, "Capability refused"),
        }
        result
    }

    /// The descriptor `name` refers to for this caller. A dynamic capability
    /// whose schema cannot be fetched or compiled is not found; a load that
    /// failed internally is an internal error.
    async fn resolve(
        &self,
        identity: Option<&Identity>,
        name: &str,
    ) -> GatewayResult<Option<Arc<CapabilityDescriptor>>> {
        if let Some(descriptor) = self.context.statics.iter().find(|d| d.name() == name) {
            return Ok(Some(Arc::clone(descriptor)));
        }
        if name != self.context.builder.capability_name() {
            return Ok(None);
        }
        let Some(identity) = identity else {
            return Ok(None);
        };
        match self.context.compiled(identity).await {
            Ok(compiled) => Ok(Some(Arc::clone(compiled.descriptor()))),
            Err(SchemaError::Internal(detail)) => Err(GatewayError::Internal(detail)),
            Err(e) => {
                warn!(
                    identity = %identity,
                    capability = name,
                    error = %e,
                    "Dynamic capability unavailable"
                );
                Ok(None)
            }
        }
    }

    /// Drops everything cached for `identity`. Returns whether anything was
    /// cached.
    pub fn invalidate(&self, identity: &Identity) -> bool {
        let schema = self.context.schemas.invalidate(identity);
        let capability = self.context.capabilities.invalidate(identity);
        info!(identity = %identity, "Invalidated cached capabilities");
        schema || capability
    }

    pub fn clear_caches(&self) {
        self.context.schemas.clear();
        self.context.capabilities.invalidate_all();
        info!("Cleared all capability caches");
    }

    pub fn cache_stats(&self) -> GatewayCacheStats {
        GatewayCacheStats {
            schema: self.context.schemas.stats(),
            capability: self.context.capabilities.stats(),
        }
    }
}
