use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;

/// Semantic type of a capability parameter.
///
/// Enum constraints live inside the variant so that a value's type and its
/// admissible set are checked together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    /// A string restricted to the declared values.
    EnumOfString { values: Vec<String> },
    /// An array of strings; when `allowed` is set every item must be one of it.
    ArrayOfString {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed: Option<Vec<String>>,
    },
}

impl ParamType {
    /// The JSON Schema `type` keyword for this parameter.
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::EnumOfString { .. } => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::ArrayOfString { .. } => "array",
        }
    }

    /// The declared enum values, for either a scalar enum or array items.
    pub fn enum_values(&self) -> Option<&[String]> {
        match self {
            Self::EnumOfString { values } => Some(values),
            Self::ArrayOfString { allowed: Some(values) } => Some(values),
            _ => None,
        }
    }

    /// Human readable description used in validation errors.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Number => "number".into(),
            Self::Integer => "integer".into(),
            Self::Boolean => "boolean".into(),
            Self::EnumOfString { values } => format!("one of [{}]", values.join(", ")),
            Self::ArrayOfString { allowed: None } => "array of strings".into(),
            Self::ArrayOfString { allowed: Some(values) } => {
                format!("array of strings, each one of [{}]", values.join(", "))
            }
        }
    }
}

/// One parameter of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Inclusive lower bound. Only meaningful for numeric types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound. Only meaningful for numeric types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ParameterSpec {
    fn new(name: &str, param_type: ParamType, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type,
            required,
            description: None,
            default: None,
            minimum: None,
            maximum: None,
        }
    }

    /// Shorthand for a required parameter.
    pub fn required(name: &str, param_type: ParamType) -> Self {
        Self::new(name, param_type, true)
    }

    /// Shorthand for an optional parameter.
    pub fn optional(name: &str, param_type: ParamType) -> Self {
        Self::new(name, param_type, false)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_bounds(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        self.param_type.enum_values()
    }

    /// Canonical parameter order: required first, then by name (byte order).
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .required
            .cmp(&self.required)
            .then_with(|| self.name.cmp(&other.name))
    }

    /// JSON Schema fragment for this parameter.
    fn json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.param_type.json_type()));
        match &self.param_type {
            ParamType::EnumOfString { values } => {
                prop.insert("enum".into(), json!(values));
            }
            ParamType::ArrayOfString { allowed } => {
                let mut items = Map::new();
                items.insert("type".into(), json!("string"));
                if let Some(values) = allowed {
                    items.insert("enum".into(), json!(values));
                }
                prop.insert("items".into(), Value::Object(items));
            }
            _ => {}
        }
        if let Some(description) = &self.description {
            prop.insert("description".into(), json!(description));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if let Some(minimum) = self.minimum {
            prop.insert("minimum".into(), json!(minimum));
        }
        if let Some(maximum) = self.maximum {
            prop.insert("maximum".into(), json!(maximum));
        }
        Value::Object(prop)
    }
}

/// What a capability hands back on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// A structured execution record (`id`, `timestamp`, `status`, `data`).
    Object,
    Number,
    Integer,
    String,
}

/// Declarative description of one callable capability.
///
/// Parameters are always kept in canonical order: every required parameter
/// precedes every optional one, and each group is sorted by name. The order
/// is enforced on construction and on deserialization, so it holds for every
/// descriptor no matter how its parameters were supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DescriptorParts")]
pub struct CapabilityDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    return_shape: ReturnShape,
}

#[derive(Deserialize)]
struct DescriptorParts {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: Vec<ParameterSpec>,
    return_shape: ReturnShape,
}

impl From<DescriptorParts> for CapabilityDescriptor {
    fn from(parts: DescriptorParts) -> Self {
        Self::new(parts.name, parts.description, parts.parameters, parts.return_shape)
    }
}

impl CapabilityDescriptor {
    /// Creates a descriptor, sorting `parameters` into canonical order.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        mut parameters: Vec<ParameterSpec>,
        return_shape: ReturnShape,
    ) -> Self {
        parameters.sort_by(ParameterSpec::canonical_cmp);
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            return_shape,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.return_shape
    }

    /// Looks up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn optional_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| !p.required)
    }

    /// Returns true if the parameters are in canonical order.
    pub fn is_canonically_ordered(&self) -> bool {
        self.parameters
            .windows(2)
            .all(|w| w[0].canonical_cmp(&w[1]) != Ordering::Greater)
    }

    /// Renders the parameters as a JSON Schema object, as expected by tool
    /// listings.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self.required_parameters().map(|p| p.name.as_str()).collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        Value::Object(schema)
    }
}
