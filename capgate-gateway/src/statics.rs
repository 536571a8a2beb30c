//! Capabilities offered to every caller, identity or not.

use crate::error::{GatewayError, GatewayResult, ValidationError};
use crate::router::{CapabilityHandler, ExecutionRouter, InvocationContext};
use async_trait::async_trait;
use capgate_model::{CapabilityDescriptor, ExecutionResult, ParamType, ParameterSpec, ReturnShape};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const ADD: &str = "add";
pub const ECHO: &str = "echo";
pub const MULTIPLY: &str = "multiply";

/// The static descriptors, in listing order.
pub fn static_descriptors() -> Vec<Arc<CapabilityDescriptor>> {
    vec![
        Arc::new(CapabilityDescriptor::new(
            ADD,
            "Add two integers.",
            operands(),
            ReturnShape::Integer,
        )),
        Arc::new(CapabilityDescriptor::new(
            ECHO,
            "Echo a message back.",
            vec![
                ParameterSpec::required("message", ParamType::String)
                    .with_description("Message to echo"),
            ],
            ReturnShape::String,
        )),
        Arc::new(CapabilityDescriptor::new(
            MULTIPLY,
            "Multiply two integers.",
            operands(),
            ReturnShape::Integer,
        )),
    ]
}

fn operands() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::required("a", ParamType::Integer).with_description("First operand"),
        ParameterSpec::required("b", ParamType::Integer).with_description("Second operand"),
    ]
}

/// Registers the handlers backing [`static_descriptors`].
pub fn register_static_handlers(router: &mut ExecutionRouter) {
    router.register_handler(ADD, Arc::new(Arithmetic::Add));
    router.register_handler(ECHO, Arc::new(Echo));
    router.register_handler(MULTIPLY, Arc::new(Arithmetic::Multiply));
}

enum Arithmetic {
    Add,
    Multiply,
}

#[async_trait]
impl CapabilityHandler for Arithmetic {
    async fn handle(
        &self,
        _context: InvocationContext<'_>,
        arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult> {
        let a = integer_argument(&arguments, "a")?;
        let b = integer_argument(&arguments, "b")?;
        let (result, verb) = match self {
            Self::Add => (a.checked_add(b), "sum"),
            Self::Multiply => (a.checked_mul(b), "product"),
        };
        let value = result.ok_or_else(|| ValidationError::TypeMismatch {
            field: "b".to_string(),
            expected: format!("integer keeping the {verb} within 64-bit range"),
        })?;
        Ok(ExecutionResult::completed(json!(value)))
    }
}

struct Echo;

#[async_trait]
impl CapabilityHandler for Echo {
    async fn handle(
        &self,
        _context: InvocationContext<'_>,
        arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Internal("echo called without a message".to_string()))?;
        Ok(ExecutionResult::completed(json!(message)))
    }
}

fn integer_argument(arguments: &Map<String, Value>, name: &str) -> GatewayResult<i64> {
    arguments
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| GatewayError::Internal(format!("argument '{name}' not validated as integer")))
}
