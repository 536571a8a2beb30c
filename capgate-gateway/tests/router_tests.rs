use async_trait::async_trait;
use capgate_gateway::statics::{self, register_static_handlers, static_descriptors};
use capgate_gateway::{
    CapabilityHandler, ExecutionRouter, GatewayError, GatewayResult, InvocationContext,
    UnknownArgumentPolicy, ValidationError,
};
use capgate_model::{
    CapabilityDescriptor, ExecutionResult, ExecutionStatus, Identity, ParamType, ParameterSpec,
    ReturnShape,
};
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::sync::Arc;

fn ticket() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "create_request",
        "",
        vec![
            ParameterSpec::required("subject", ParamType::String),
            ParameterSpec::required(
                "priority",
                ParamType::EnumOfString {
                    values: vec!["low".into(), "medium".into(), "high".into()],
                },
            ),
            ParameterSpec::optional("hours", ParamType::Number).with_bounds(Some(1.0), Some(40.0)),
            ParameterSpec::optional(
                "tags",
                ParamType::ArrayOfString {
                    allowed: Some(vec!["network".into(), "email".into()]),
                },
            ),
            ParameterSpec::optional("notes", ParamType::ArrayOfString { allowed: None }),
            ParameterSpec::optional("urgent", ParamType::Boolean),
        ],
        ReturnShape::Object,
    )
}

fn router() -> ExecutionRouter {
    ExecutionRouter::new(UnknownArgumentPolicy::Reject)
}

fn validation_error(result: Result<Map<String, Value>, ValidationError>) -> ValidationError {
    result.expect_err("arguments should have been rejected")
}

// ── Validation order ────────────────────────────────────────────

#[test]
fn missing_required_reported_before_type_errors() {
    let err = validation_error(router().validate(
        &ticket(),
        json!({"priority": "critical", "bogus": 1}),
    ));
    assert_eq!(
        err,
        ValidationError::MissingRequired {
            missing: vec!["subject".into()]
        }
    );
}

#[test]
fn all_missing_required_are_listed_in_parameter_order() {
    let err = validation_error(router().validate(&ticket(), json!({})));
    assert_eq!(
        err,
        ValidationError::MissingRequired {
            missing: vec!["priority".into(), "subject".into()]
        }
    );
}

#[test]
fn type_errors_reported_before_unknown_arguments() {
    let err = validation_error(router().validate(
        &ticket(),
        json!({"subject": 5, "priority": "low", "bogus": 1}),
    ));
    assert_eq!(
        err,
        ValidationError::TypeMismatch {
            field: "subject".into(),
            expected: "string".into()
        }
    );
}

#[test]
fn null_counts_as_absent() {
    let err = validation_error(router().validate(
        &ticket(),
        json!({"subject": null, "priority": "low"}),
    ));
    assert!(matches!(err, ValidationError::MissingRequired { .. }));

    let ok = router()
        .validate(&ticket(), json!({"subject": "x", "priority": "low", "hours": null}))
        .unwrap();
    assert_eq!(ok.get("hours"), Some(&Value::Null));
}

#[test]
fn non_object_arguments_rejected() {
    for arguments in [json!([1, 2]), json!("subject"), Value::Null] {
        assert_eq!(
            validation_error(router().validate(&ticket(), arguments)),
            ValidationError::NotAnObject
        );
    }
}

// ── Value checks ────────────────────────────────────────────────

#[test]
fn enum_value_outside_declared_set_is_rejected() {
    let err = validation_error(router().validate(
        &ticket(),
        json!({"subject": "x", "priority": "critical"}),
    ));
    assert_eq!(
        err,
        ValidationError::TypeMismatch {
            field: "priority".into(),
            expected: "one of [low, medium, high]".into()
        }
    );
}

#[test]
fn array_items_are_checked_against_allowed_values() {
    let base = |tags: Value| json!({"subject": "x", "priority": "low", "tags": tags});

    assert!(router().validate(&ticket(), base(json!(["email"]))).is_ok());
    assert!(router().validate(&ticket(), base(json!([]))).is_ok());

    let err = validation_error(router().validate(&ticket(), base(json!(["email", "printer"]))));
    assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "tags"));

    let err = validation_error(router().validate(&ticket(), base(json!("email"))));
    assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "tags"));
}

#[test]
fn unconstrained_array_accepts_any_strings_only() {
    let base = |notes: Value| json!({"subject": "x", "priority": "low", "notes": notes});
    assert!(router().validate(&ticket(), base(json!(["a", "b"]))).is_ok());
    assert!(router().validate(&ticket(), base(json!(["a", 1]))).is_err());
}

#[test]
fn numeric_bounds_are_inclusive() {
    let base = |hours: Value| json!({"subject": "x", "priority": "low", "hours": hours});

    assert!(router().validate(&ticket(), base(json!(1))).is_ok());
    assert!(router().validate(&ticket(), base(json!(40.0))).is_ok());

    assert_eq!(
        validation_error(router().validate(&ticket(), base(json!(0.5)))),
        ValidationError::TypeMismatch {
            field: "hours".into(),
            expected: "number >= 1".into()
        }
    );
    assert_eq!(
        validation_error(router().validate(&ticket(), base(json!(41)))),
        ValidationError::TypeMismatch {
            field: "hours".into(),
            expected: "number <= 40".into()
        }
    );
}

#[test]
fn boolean_and_integer_types() {
    let base = |urgent: Value| json!({"subject": "x", "priority": "low", "urgent": urgent});
    assert!(router().validate(&ticket(), base(json!(true))).is_ok());
    assert!(router().validate(&ticket(), base(json!("true"))).is_err());

    let descriptors = static_descriptors();
    let add = &descriptors[0];
    assert!(router().validate(add, json!({"a": 1, "b": -2})).is_ok());
    assert!(router().validate(add, json!({"a": 1.5, "b": 2})).is_err());
}

// ── Unknown arguments ───────────────────────────────────────────

#[test]
fn unknown_arguments_rejected_by_default() {
    let err = validation_error(ExecutionRouter::default().validate(
        &ticket(),
        json!({"subject": "x", "priority": "low", "zzz": 1, "aaa": 2}),
    ));
    assert_eq!(
        err,
        ValidationError::UnknownArguments {
            fields: vec!["aaa".into(), "zzz".into()]
        }
    );
}

#[test]
fn unknown_arguments_dropped_when_ignored() {
    let router = ExecutionRouter::new(UnknownArgumentPolicy::Ignore);
    assert_eq!(router.unknown_argument_policy(), UnknownArgumentPolicy::Ignore);

    let validated = router
        .validate(&ticket(), json!({"subject": "x", "priority": "low", "zzz": 1}))
        .unwrap();
    assert_eq!(Value::Object(validated), json!({"subject": "x", "priority": "low"}));
}

// ── Dispatch ────────────────────────────────────────────────────

#[tokio::test]
async fn default_handler_echoes_and_stamps() {
    let arguments = json!({"subject": "Printer on fire", "priority": "high", "tags": ["email"]});

    let context = InvocationContext::anonymous("create_request");
    let first = router().execute(context, arguments.clone(), &ticket()).await.unwrap();
    let second = router().execute(context, arguments.clone(), &ticket()).await.unwrap();

    assert_eq!(first.status, ExecutionStatus::Pending);
    assert_eq!(first.data, arguments);
    assert_ne!(first.id, second.id);
    assert!(second.timestamp >= first.timestamp);

    let serialized = serde_json::to_value(&first).unwrap();
    assert_eq!(serialized["status"], "pending");
    assert!(serialized["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn validation_failure_never_reaches_handler() {
    let err = router()
        .execute(
            InvocationContext::anonymous("create_request"),
            json!({"subject": "x"}),
            &ticket(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(_)));
    assert!(err.is_caller_error());
}

struct Constant;

#[async_trait]
impl CapabilityHandler for Constant {
    async fn handle(
        &self,
        _context: InvocationContext<'_>,
        _arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult> {
        Ok(ExecutionResult::completed(json!("constant")))
    }
}

#[tokio::test]
async fn registered_handler_replaces_default() {
    let mut router = router();
    assert!(!router.has_handler("create_request"));
    router.register_handler("create_request", Arc::new(Constant));
    assert!(router.has_handler("create_request"));

    let result = router
        .execute(
            InvocationContext::anonymous("create_request"),
            json!({"subject": "x", "priority": "low"}),
            &ticket(),
        )
        .await
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.data, json!("constant"));
}

/// Reports who called it and under which name.
struct Whoami;

#[async_trait]
impl CapabilityHandler for Whoami {
    async fn handle(
        &self,
        context: InvocationContext<'_>,
        _arguments: Map<String, Value>,
    ) -> GatewayResult<ExecutionResult> {
        Ok(ExecutionResult::completed(json!({
            "capability": context.capability,
            "caller": context.identity.map(Identity::redacted),
        })))
    }
}

#[tokio::test]
async fn handler_receives_caller_and_capability() {
    let mut router = router();
    router.register_handler("create_request", Arc::new(Whoami));
    let caller = Identity::parse("alpha").unwrap();

    let result = router
        .execute(
            InvocationContext::new("create_request", Some(&caller)),
            json!({"subject": "x", "priority": "low"}),
            &ticket(),
        )
        .await
        .unwrap();
    assert_eq!(result.data, json!({"capability": "create_request", "caller": "alpha"}));

    let anonymous = router
        .execute(
            InvocationContext::anonymous("create_request"),
            json!({"subject": "x", "priority": "low"}),
            &ticket(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.data["caller"], Value::Null);
}

// ── Static handlers ─────────────────────────────────────────────

fn static_router() -> (ExecutionRouter, Vec<Arc<CapabilityDescriptor>>) {
    let mut router = router();
    register_static_handlers(&mut router);
    (router, static_descriptors())
}

#[test]
fn static_descriptors_in_listing_order() {
    let names: Vec<String> = static_descriptors().iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec![statics::ADD, statics::ECHO, statics::MULTIPLY]);

    let descriptors = static_descriptors();
    let add = &descriptors[0];
    assert_eq!(add.return_shape(), ReturnShape::Integer);
    assert_eq!(add.required_parameters().count(), 2);
}

#[tokio::test]
async fn add_echo_and_multiply() {
    let (router, descriptors) = static_router();

    let sum = router
        .execute(InvocationContext::anonymous("add"), json!({"a": 2, "b": 40}), &descriptors[0])
        .await
        .unwrap();
    assert_eq!(sum.status, ExecutionStatus::Completed);
    assert_eq!(sum.data, json!(42));

    let echo = router
        .execute(InvocationContext::anonymous("echo"), json!({"message": "hi"}), &descriptors[1])
        .await
        .unwrap();
    assert_eq!(echo.data, json!("hi"));

    let product = router
        .execute(
            InvocationContext::anonymous("multiply"),
            json!({"a": -6, "b": 7}),
            &descriptors[2],
        )
        .await
        .unwrap();
    assert_eq!(product.data, json!(-42));
}

#[tokio::test]
async fn arithmetic_overflow_is_a_caller_error() {
    let (router, descriptors) = static_router();
    let err = router
        .execute(
            InvocationContext::anonymous("multiply"),
            json!({"a": i64::MAX, "b": 2}),
            &descriptors[2],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Validation(ValidationError::TypeMismatch { .. })
    ));
}

#[tokio::test]
async fn static_arguments_are_validated() {
    let (router, descriptors) = static_router();
    let err = router
        .execute(
            InvocationContext::anonymous("add"),
            json!({"a": "2", "b": 3}),
            &descriptors[0],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Validation(ValidationError::TypeMismatch { ref field, .. }) if field == "a"
    ));
}
