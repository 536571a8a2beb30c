//! Core capability model for capgate.
//!
//! Defines the types every other capgate crate depends on:
//! - [`Identity`]: the opaque caller credential used as a cache key
//! - [`RawSchema`] / [`FieldRecord`]: the permission schema as served by the
//!   external schema source
//! - [`FieldDescriptor`] / [`CapabilitySchema`]: validated, typed fields
//! - [`CapabilityDescriptor`]: the declarative description of one callable
//!   capability, with its ordered parameter list
//! - [`CapabilityBuilder`]: the pure compiler from raw schema to descriptor
//! - [`ExecutionRequest`] / [`ExecutionResult`]: invocation payloads
//!
//! Descriptors are plain data. Nothing here synthesizes callables; dispatch
//! happens by capability name in the gateway.

mod builder;
mod descriptor;
mod error;
mod execution;
mod identity;
mod schema;

pub use builder::{CapabilityBuilder, DEFAULT_CAPABILITY_DESCRIPTION, DEFAULT_CAPABILITY_NAME};
pub use descriptor::{CapabilityDescriptor, ParamType, ParameterSpec, ReturnShape};
pub use error::{SchemaError, SchemaFetchError, SchemaMalformedError, SchemaResult};
pub use execution::{ExecutionRequest, ExecutionResult, ExecutionStatus};
pub use identity::Identity;
pub use schema::{CapabilitySchema, ExternalFieldType, FieldDescriptor, FieldRecord, RawSchema};
