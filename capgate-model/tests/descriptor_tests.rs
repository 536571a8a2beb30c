use capgate_model::{CapabilityDescriptor, ParamType, ParameterSpec, ReturnShape};
use pretty_assertions::assert_eq;
use serde_json::json;

fn priority_type() -> ParamType {
    ParamType::EnumOfString {
        values: vec!["low".into(), "medium".into(), "high".into()],
    }
}

fn ticket_descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "create_request",
        "Creates a request",
        vec![
            ParameterSpec::optional("tags", ParamType::ArrayOfString { allowed: None }),
            ParameterSpec::required("subject", ParamType::String).with_description("Subject"),
            ParameterSpec::optional("estimate", ParamType::Number).with_bounds(Some(1.0), Some(40.0)),
            ParameterSpec::required("priority", priority_type()),
        ],
        ReturnShape::Object,
    )
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_sorts_parameters_canonically() {
    let d = ticket_descriptor();
    let order: Vec<&str> = d.parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, vec!["priority", "subject", "estimate", "tags"]);
    assert!(d.is_canonically_ordered());
}

#[test]
fn required_and_optional_views() {
    let d = ticket_descriptor();
    let required: Vec<&str> = d.required_parameters().map(|p| p.name.as_str()).collect();
    let optional: Vec<&str> = d.optional_parameters().map(|p| p.name.as_str()).collect();
    assert_eq!(required, vec!["priority", "subject"]);
    assert_eq!(optional, vec!["estimate", "tags"]);
}

#[test]
fn parameter_lookup() {
    let d = ticket_descriptor();
    assert_eq!(d.parameter("priority").unwrap().param_type, priority_type());
    assert!(d.parameter("nope").is_none());
}

#[test]
fn enum_values_cover_scalars_and_arrays() {
    assert_eq!(
        ParameterSpec::required("p", priority_type()).enum_values().unwrap(),
        &["low".to_string(), "medium".to_string(), "high".to_string()]
    );
    let tags = ParamType::ArrayOfString {
        allowed: Some(vec!["a".into()]),
    };
    assert_eq!(tags.enum_values().unwrap(), &["a".to_string()]);
    assert!(ParamType::String.enum_values().is_none());
}

#[test]
fn describe_is_human_readable() {
    assert_eq!(priority_type().describe(), "one of [low, medium, high]");
    assert_eq!(ParamType::Integer.describe(), "integer");
    assert_eq!(
        ParamType::ArrayOfString { allowed: None }.describe(),
        "array of strings"
    );
}

// ── JSON Schema rendering ────────────────────────────────────────

#[test]
fn input_schema_renders_json_schema() {
    let schema = ticket_descriptor().input_schema();
    assert_eq!(
        schema,
        json!({
            "type": "object",
            "properties": {
                "estimate": {"type": "number", "minimum": 1.0, "maximum": 40.0},
                "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                "subject": {"type": "string", "description": "Subject"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["priority", "subject"]
        })
    );
}

#[test]
fn input_schema_omits_empty_required_list() {
    let d = CapabilityDescriptor::new(
        "echo",
        "",
        vec![ParameterSpec::optional("message", ParamType::String)],
        ReturnShape::String,
    );
    assert!(d.input_schema().get("required").is_none());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serialization_uses_tagged_types() {
    let json = serde_json::to_value(ticket_descriptor()).unwrap();
    assert_eq!(json["name"], "create_request");
    assert_eq!(json["return_shape"], "object");
    assert_eq!(json["parameters"][0]["type"]["kind"], "enum_of_string");
    assert_eq!(json["parameters"][0]["type"]["values"][2], "high");
}

#[test]
fn deserialization_restores_canonical_order() {
    let json = json!({
        "name": "x",
        "parameters": [
            {"name": "b", "type": {"kind": "string"}, "required": false},
            {"name": "a", "type": {"kind": "string"}, "required": false},
            {"name": "z", "type": {"kind": "integer"}, "required": true}
        ],
        "return_shape": "number"
    });

    let d: CapabilityDescriptor = serde_json::from_value(json).unwrap();
    let order: Vec<&str> = d.parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, vec!["z", "a", "b"]);
    assert_eq!(d.description(), "");
}
