//! Per-identity caches for capgate.
//!
//! Two caches sit between the gateway and the schema source:
//!
//! - [`SchemaCache`] keeps raw schemas fetched from a [`SchemaSource`]
//! - [`CapabilityCache`] keeps compiled descriptors and the merged listing
//!
//! Both are thin typed wrappers over [`TtlCache`], which provides the shared
//! contract:
//!
//! 1. **TTL**: an entry is served until its `expires_at`; expiry is checked
//!    lazily on read, and expired entries of other keys are evicted at most
//!    once per TTL when a load starts or stats are read
//! 2. **Single-flight**: at most one load per key is in flight; concurrent
//!    callers await that load and receive the same result
//! 3. **No negative caching**: a failed load leaves the slot empty, so the
//!    next call loads again
//! 4. **Detached loads**: loads run on their own task, so a caller that gives
//!    up never strands the other waiters
//!
//! [`SchemaSource`]: capgate_source::SchemaSource

mod capability_cache;
mod error;
mod schema_cache;
mod stats;
mod ttl;

pub use capability_cache::{CapabilityCache, CompiledCapabilities};
pub use error::LoadAborted;
pub use schema_cache::SchemaCache;
pub use stats::CacheStats;
pub use ttl::{CachedEntry, TtlCache};
