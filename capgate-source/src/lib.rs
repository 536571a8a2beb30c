//! Schema sources for capgate.
//!
//! A schema source answers one question: which fields may this identity
//! supply? Sources are leaf I/O. They do not cache and do not retry; the
//! caching layer above them owns both concerns.
//!
//! - [`HttpSchemaSource`] queries the form-schema API with the identity as a
//!   bearer token
//! - [`StaticSchemaSource`] serves schemas from memory (local runs, tests)

pub mod http;
pub mod memory;
mod source;

pub use http::{HttpSchemaSource, SchemaSourceConfig};
pub use memory::StaticSchemaSource;
pub use source::SchemaSource;
