use crate::descriptor::{ParamType, ParameterSpec};
use crate::error::{SchemaMalformedError, SchemaResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A permission schema exactly as served by the schema source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    #[serde(rename = "fieldList", alias = "fields", default)]
    pub fields: Vec<FieldRecord>,
}

impl RawSchema {
    pub fn new(fields: Vec<FieldRecord>) -> Self {
        Self { fields }
    }
}

/// One field record of a raw schema.
///
/// Every attribute is optional on the wire; a record without a name is
/// rejected later by the builder, not during decoding. Both the camelCase
/// names of the form API and the descriptive names (`externalParamName`,
/// `typeTag`, `enumValues`) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "paramName",
        alias = "externalParamName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub param_name: Option<String>,
    #[serde(rename = "type", alias = "typeTag", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub requester_required: bool,
    #[serde(alias = "enumValues", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(rename = "inActive", alias = "inactive", default)]
    pub inactive: bool,
    #[serde(default)]
    pub requester_view_only: bool,
    #[serde(default)]
    pub requester_can_edit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Lower bound for number fields (the form API reuses the length slots).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    /// Upper bound for number fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
}

impl FieldRecord {
    /// Shorthand for a named record of the given external type.
    pub fn named(name: &str, type_tag: &str) -> Self {
        Self {
            name: Some(name.into()),
            type_tag: Some(type_tag.into()),
            ..Default::default()
        }
    }

    pub fn with_param_name(mut self, param_name: &str) -> Self {
        self.param_name = Some(param_name.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| (*o).to_string()).collect());
        self
    }
}

/// Field types known to the form API.
///
/// Tags are accepted with or without the API's `Rest` suffix
/// (`TextField` and `TextFieldRest` are the same type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalFieldType {
    Text,
    TextArea,
    RichTextArea,
    Number,
    DropDown,
    MultiSelectDropDown,
    CheckBox,
    Attachment,
    System,
    Api,
    Display,
    /// Anything else, including an absent tag. Treated as a string.
    Unrecognized(String),
}

impl ExternalFieldType {
    pub fn parse(tag: &str) -> Self {
        let base = tag.strip_suffix("Rest").unwrap_or(tag);
        match base {
            "TextField" => Self::Text,
            "TextAreaField" => Self::TextArea,
            "RichTextAreaField" => Self::RichTextArea,
            "NumberField" => Self::Number,
            "DropDownField" => Self::DropDown,
            "MultiSelectDropDownField" => Self::MultiSelectDropDown,
            "CheckBoxField" => Self::CheckBox,
            "AttachmentField" => Self::Attachment,
            "SystemField" => Self::System,
            "APIField" => Self::Api,
            "DisplayField" => Self::Display,
            _ => Self::Unrecognized(tag.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Maps the external type onto a parameter type. `options` are the
    /// declared option values; an empty list means "unconstrained".
    pub fn param_type(&self, options: Option<&[String]>) -> ParamType {
        let options = options.filter(|o| !o.is_empty()).map(<[String]>::to_vec);
        match self {
            Self::Number => ParamType::Number,
            Self::DropDown => match options {
                Some(values) => ParamType::EnumOfString { values },
                None => ParamType::String,
            },
            Self::MultiSelectDropDown | Self::CheckBox => ParamType::ArrayOfString { allowed: options },
            Self::Text
            | Self::TextArea
            | Self::RichTextArea
            | Self::Attachment
            | Self::System
            | Self::Api
            | Self::Display
            | Self::Unrecognized(_) => ParamType::String,
        }
    }
}

/// A typed, named field derived from one [`FieldRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Display name from the schema.
    pub name: String,
    /// Name the caller uses when supplying this field.
    pub external_param_name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub hidden: bool,
    pub removed: bool,
    pub inactive: bool,
    /// Visible to the requester but not editable.
    pub view_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl FieldDescriptor {
    /// Converts a raw record. `index` is the record's position, used in the
    /// error when the record has no name.
    pub fn from_record(index: usize, record: &FieldRecord) -> SchemaResult<Self> {
        let name = record
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SchemaMalformedError::missing_name(index))?;

        let external_param_name = record
            .param_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map_or_else(|| derive_param_name(name), str::to_string);

        let external_type = ExternalFieldType::parse(record.type_tag.as_deref().unwrap_or(""));
        if !external_type.is_recognized() {
            tracing::warn!(
                field = %name,
                type_tag = ?record.type_tag,
                "Unrecognized field type, treating as string"
            );
        }
        let param_type = external_type.param_type(record.options.as_deref());

        let (minimum, maximum) = if external_type == ExternalFieldType::Number {
            (
                record.min_length.filter(|v| *v > 0.0),
                record.max_length.filter(|v| *v > 0.0),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            name: name.to_string(),
            external_param_name,
            param_type,
            required: record.required || record.requester_required,
            hidden: record.hidden,
            removed: record.removed,
            inactive: record.inactive,
            view_only: record.requester_view_only && !record.requester_can_edit,
            default: record.default_value.clone(),
            minimum,
            maximum,
        })
    }

    /// Returns true if this field must not be offered to the caller.
    pub fn is_excluded(&self) -> bool {
        self.hidden || self.removed || self.inactive || self.view_only
    }

    /// The parameter this field contributes to a capability.
    pub fn to_parameter(&self) -> ParameterSpec {
        let spec = if self.required {
            ParameterSpec::required(&self.external_param_name, self.param_type.clone())
        } else {
            ParameterSpec::optional(&self.external_param_name, self.param_type.clone())
        };
        let spec = spec
            .with_description(self.name.clone())
            .with_bounds(self.minimum, self.maximum);
        match &self.default {
            Some(default) => spec.with_default(default.clone()),
            None => spec,
        }
    }
}

/// Lower-cases a display name and replaces spaces and dashes with `_`.
fn derive_param_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// The admitted fields of one identity's schema at one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySchema {
    fields: Vec<FieldDescriptor>,
    built_at: DateTime<Utc>,
}

impl CapabilitySchema {
    pub fn new(fields: Vec<FieldDescriptor>, built_at: DateTime<Utc>) -> Self {
        Self { fields, built_at }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
