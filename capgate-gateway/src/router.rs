//! Argument validation and name-keyed dispatch.
//!
//! The router never decides *which* descriptor applies; the gateway resolves
//! it and hands it in. The router checks the arguments against it and runs
//! the handler registered under the capability name, or the echo-and-stamp
//! handler when none is registered.

use crate::error::{GatewayResult, ValidationError};
use async_trait::async_trait;
use capgate_model::{CapabilityDescriptor, ExecutionResult, Identity, ParamType, ParameterSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Who is invoking which capability.
#[derive(Debug, Clone, Copy)]
pub struct InvocationContext<'a> {
    pub capability: &'a str,
    /// The resolved caller; `None` for anonymous invocations of static
    /// capabilities.
    pub identity: Option<&'a Identity>,
}

impl<'a> InvocationContext<'a> {
    pub fn new(capability: &'a str, identity: Option<&'a Identity>) -> Self {
        Self { capability, identity }
    }

    pub fn anonymous(capability: &'a str) -> Self {
        Self::new(capability, None)
    }
}

/// Executes one capability with already validated arguments.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(
        &self,
        context: InvocationContext<'_>,
        arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult>;
}

/// Default handler: records the request as pending and echoes the arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoAndStamp;

#[async_trait]
impl CapabilityHandler for EchoAndStamp {
    async fn handle(
        &self,
        _context: InvocationContext<'_>,
        arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult> {
        Ok(ExecutionResult::pending(Value::Object(arguments)))
    }
}

/// What to do with top-level arguments the descriptor does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownArgumentPolicy {
    #[default]
    Reject,
    /// Drop them before the handler runs.
    Ignore,
}

pub struct ExecutionRouter {
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
    fallback: Arc<dyn CapabilityHandler>,
    unknown_arguments: UnknownArgumentPolicy,
}

impl Default for ExecutionRouter {
    fn default() -> Self {
        Self::new(UnknownArgumentPolicy::default())
    }
}

impl ExecutionRouter {
    pub fn new(unknown_arguments: UnknownArgumentPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(EchoAndStamp),
            unknown_arguments,
        }
    }

    /// Routes `name` to `handler`, replacing any previous registration.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn CapabilityHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!(capability = %name, "Replaced capability handler");
        }
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn unknown_argument_policy(&self) -> UnknownArgumentPolicy {
        self.unknown_arguments
    }

    /// Validates `arguments` against `descriptor` and runs the handler
    /// registered for `context.capability`.
    pub async fn execute(
        &self,
        context: InvocationContext<'_>,
        arguments: Value,
        descriptor: &CapabilityDescriptor,
    ) -> GatewayResult<ExecutionResult> {
        let validated = self.validate(descriptor, arguments)?;
        let handler = self
            .handlers
            .get(context.capability)
            .unwrap_or(&self.fallback);
        debug!(
            capability = context.capability,
            arguments = validated.len(),
            "Dispatching capability"
        );
        handler.handle(context, validated).await
    }

    /// Checks arguments in a fixed order and returns the map handed to the
    /// handler. A JSON `null` counts as an absent argument.
    pub fn validate(
        &self,
        descriptor: &CapabilityDescriptor,
        arguments: Value,
    ) -> Result<Map<String, Value>, ValidationError> {
        let Value::Object(mut arguments) = arguments else {
            return Err(ValidationError::NotAnObject);
        };

        let missing: Vec<String> = descriptor
            .required_parameters()
            .filter(|p| arguments.get(&p.name).is_none_or(Value::is_null))
            .map(|p| p.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired { missing });
        }

        for param in descriptor.parameters() {
            match arguments.get(&param.name) {
                Some(value) if !value.is_null() => check_value(param, value)?,
                _ => {}
            }
        }

        let unknown: Vec<String> = arguments
            .keys()
            .filter(|key| descriptor.parameter(key).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            match self.unknown_arguments {
                UnknownArgumentPolicy::Reject => {
                    return Err(ValidationError::UnknownArguments { fields: unknown });
                }
                UnknownArgumentPolicy::Ignore => {
                    debug!(
                        capability = descriptor.name(),
                        dropped = ?unknown,
                        "Ignoring undeclared arguments"
                    );
                    for key in &unknown {
                        arguments.remove(key);
                    }
                }
            }
        }

        Ok(arguments)
    }
}

fn check_value(param: &ParameterSpec, value: &Value) -> Result<(), ValidationError> {
    let mismatch = |expected: String| ValidationError::TypeMismatch {
        field: param.name.clone(),
        expected,
    };

    let type_ok = match &param.param_type {
        ParamType::String => value.is_string(),
        ParamType::Number => value.is_number(),
        ParamType::Integer => value.is_i64(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::EnumOfString { values } => value
            .as_str()
            .is_some_and(|s| values.iter().any(|v| v == s)),
        ParamType::ArrayOfString { allowed } => value.as_array().is_some_and(|items| {
            items.iter().all(|item| {
                item.as_str().is_some_and(|s| {
                    allowed
                        .as_ref()
                        .is_none_or(|values| values.iter().any(|v| v == s))
                })
            })
        }),
    };
    if !type_ok {
        return Err(mismatch(param.param_type.describe()));
    }

    if let Some(n) = value.as_f64() {
        if let Some(minimum) = param.minimum.filter(|min| n < *min) {
            return Err(mismatch(format!("{} >= {minimum}", param.param_type.describe())));
        }
        if let Some(maximum) = param.maximum.filter(|max| n > *max) {
            return Err(mismatch(format!("{} <= {maximum}", param.param_type.describe())));
        }
    }
    Ok(())
}
