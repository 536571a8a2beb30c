//! capgate gateway.
//!
//! Ties the schema source, both caches and the builder together behind two
//! operations:
//!
//! - **list**: static capabilities followed by the caller's dynamic
//!   capability; schema failures degrade to the static set
//! - **invoke**: resolve by name, validate the arguments, dispatch to the
//!   registered handler
//!
//! Configuration ([`GatewayConfig`]) is read from TOML and every field has a
//! default.

mod config;
mod error;
mod gateway;
mod identity;
mod router;
pub mod statics;

pub use config::{CacheConfig, CapabilityConfig, GatewayConfig, RouterConfig, ServerConfig};
pub use error::{ConfigError, GatewayError, GatewayResult, ValidationError};
pub use gateway::{Gateway, GatewayCacheStats, GatewayContext};
pub use identity::{BearerTokenExtractor, IdentityExtractor};
pub use router::{
    CapabilityHandler, EchoAndStamp, ExecutionRouter, InvocationContext, UnknownArgumentPolicy,
};
