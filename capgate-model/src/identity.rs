//! Caller identity.
//!
//! An identity is whatever opaque credential the transport extracted for the
//! caller (usually a bearer token). It is only ever used as a partition key
//! and forwarded to the schema source; it is never parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of leading characters kept when an identity is rendered for logs.
const REDACTED_PREFIX: usize = 20;

/// Opaque caller credential. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Creates an identity from a credential string, trimming whitespace.
    /// Returns `None` for blank input: a blank credential is no identity.
    pub fn parse(credential: &str) -> Option<Self> {
        let trimmed = credential.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    /// Returns the full credential. Do not log this.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a log-safe rendering: a short prefix followed by `...` when
    /// the credential is longer than the prefix.
    pub fn redacted(&self) -> String {
        match self.0.char_indices().nth(REDACTED_PREFIX) {
            Some((cut, _)) => format!("{}...", &self.0[..cut]),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&self.redacted()).finish()
    }
}

/// Displays the redacted form, so `%identity` in tracing fields is safe.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
