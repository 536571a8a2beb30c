//! Compilation of raw permission schemas into capability descriptors.
//!
//! The builder is pure: it reads nothing but its input and its own
//! configuration, and the same input always yields the same descriptor,
//! parameter for parameter. Build timestamps are only attached to the
//! intermediate [`CapabilitySchema`], never to the descriptor itself.

use crate::descriptor::{CapabilityDescriptor, ParameterSpec, ReturnShape};
use crate::error::SchemaResult;
use crate::schema::{CapabilitySchema, FieldDescriptor, RawSchema};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Name of the per-identity capability when none is configured.
pub const DEFAULT_CAPABILITY_NAME: &str = "create_request";

/// Description of the per-identity capability when none is configured.
pub const DEFAULT_CAPABILITY_DESCRIPTION: &str =
    "Creates a new request with dynamically defined fields based on your permissions.";

/// Compiles raw schemas into the descriptor of one named capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityBuilder {
    name: String,
    description: String,
}

impl Default for CapabilityBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPABILITY_NAME, DEFAULT_CAPABILITY_DESCRIPTION)
    }
}

impl CapabilityBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Name of the capability this builder produces.
    pub fn capability_name(&self) -> &str {
        &self.name
    }

    /// Converts every record and keeps the admitted ones, in schema order.
    ///
    /// Fails on the first record without a name, even if that record would
    /// have been excluded.
    pub fn compile(&self, raw: &RawSchema) -> SchemaResult<Vec<FieldDescriptor>> {
        let mut admitted = Vec::with_capacity(raw.fields.len());
        for (index, record) in raw.fields.iter().enumerate() {
            let field = FieldDescriptor::from_record(index, record)?;
            if field.is_excluded() {
                debug!(field = %field.name, "Excluding field from capability");
                continue;
            }
            admitted.push(field);
        }
        Ok(admitted)
    }

    /// Like [`compile`](Self::compile), stamped with a build time.
    pub fn compile_schema(
        &self,
        raw: &RawSchema,
        built_at: DateTime<Utc>,
    ) -> SchemaResult<CapabilitySchema> {
        Ok(CapabilitySchema::new(self.compile(raw)?, built_at))
    }

    /// Compiles a raw schema straight into a descriptor.
    pub fn build(&self, raw: &RawSchema) -> SchemaResult<CapabilityDescriptor> {
        let fields = self.compile(raw)?;
        Ok(self.build_from_fields(&fields))
    }

    /// Builds a descriptor from already admitted fields.
    ///
    /// When two fields share a parameter name the later one wins.
    pub fn build_from_fields(&self, fields: &[FieldDescriptor]) -> CapabilityDescriptor {
        let mut by_name: BTreeMap<&str, ParameterSpec> = BTreeMap::new();
        for field in fields {
            if let Some(previous) = by_name.insert(field.external_param_name.as_str(), field.to_parameter()) {
                warn!(
                    param = %field.external_param_name,
                    replaced = ?previous.description,
                    "Duplicate parameter name in schema, keeping the later field"
                );
            }
        }

        let descriptor = CapabilityDescriptor::new(
            self.name.clone(),
            self.description.clone(),
            by_name.into_values().collect(),
            ReturnShape::Object,
        );
        debug!(
            capability = %self.name,
            parameters = descriptor.parameters().len(),
            "Built capability descriptor"
        );
        descriptor
    }
}
