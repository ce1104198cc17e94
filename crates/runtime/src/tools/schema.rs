//! Input models built from MCP tool JSON schemas
//!
//! A remote tool publishes a JSON schema for its arguments. The schema is
//! flattened into an `InputModel`: one typed field per top-level property.
//! Arguments coming from the model are checked against it before the call
//! is forwarded, and optional fields are filled with `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Argument validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{model}: arguments must be a JSON object, got {found}")]
    NotAnObject { model: String, found: String },

    #[error("{model}: missing required field '{field}'")]
    MissingField { model: String, field: String },

    #[error("{model}: field '{field}' expected {expected}, got {found}")]
    WrongType {
        model: String,
        field: String,
        expected: FieldType,
        found: String,
    },
}

/// Field type of an input model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    /// Map a JSON schema type tag; unknown tags become `Any`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "string" => FieldType::String,
            "integer" => FieldType::Integer,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            _ => FieldType::Any,
        }
    }

    /// JSON schema tag, `None` for `Any`
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            FieldType::String => Some("string"),
            FieldType::Integer => Some("integer"),
            FieldType::Number => Some("number"),
            FieldType::Boolean => Some("boolean"),
            FieldType::Array => Some("array"),
            FieldType::Object => Some("object"),
            FieldType::Any => None,
        }
    }

    fn from_property(property: &Value) -> Self {
        match property.get("type") {
            Some(Value::String(tag)) => Self::from_tag(tag),
            // ["string", "null"] style unions
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .find(|tag| *tag != "null")
                .map(Self::from_tag)
                .unwrap_or(FieldType::Any),
            _ => FieldType::Any,
        }
    }

    /// Check a value, possibly coercing it.
    ///
    /// Models often quote scalars, so numeric strings are accepted for
    /// integers and numbers, and `"true"`/`"false"` style strings (or 0/1)
    /// for booleans. Whole floats are accepted for integers.
    fn accept(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldType::Any, v) => Some(v.clone()),
            (FieldType::String, Value::String(_))
            | (FieldType::Boolean, Value::Bool(_))
            | (FieldType::Array, Value::Array(_))
            | (FieldType::Object, Value::Object(_))
            | (FieldType::Number, Value::Number(_)) => Some(value.clone()),
            (FieldType::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Some(value.clone())
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| Value::from(f as i64))
                }
            }
            (FieldType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (FieldType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            (FieldType::Boolean, Value::String(s)) => parse_bool(s).map(Value::Bool),
            (FieldType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag().unwrap_or("any"))
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// One argument of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Filled in when the argument is omitted; required fields have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Typed argument model of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputModel {
    pub name: String,
    pub fields: Vec<InputField>,
}

impl InputModel {
    /// Build a model from a JSON schema.
    ///
    /// Returns `None` when the schema is not an object or declares no
    /// `properties`.
    pub fn from_json_schema(schema: &Value, model_name: &str) -> Option<Self> {
        let schema = schema.as_object()?;
        let properties = schema.get("properties")?.as_object()?;

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let fields = properties
            .iter()
            .map(|(name, property)| {
                let is_required = required.contains(&name.as_str());
                InputField {
                    name: name.clone(),
                    field_type: FieldType::from_property(property),
                    required: is_required,
                    description: property
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    default: if is_required { None } else { Some(Value::Null) },
                }
            })
            .collect();

        Some(Self {
            name: model_name.to_string(),
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate arguments and fill defaults.
    ///
    /// Declared fields come first in model order; undeclared keys are kept.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, ValidationError> {
        let provided = match args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ValidationError::NotAnObject {
                    model: self.name.clone(),
                    found: describe_value(other),
                });
            }
        };

        let mut validated = Map::new();
        for field in &self.fields {
            match provided.get(&field.name) {
                None => {
                    if field.required {
                        return Err(ValidationError::MissingField {
                            model: self.name.clone(),
                            field: field.name.clone(),
                        });
                    }
                    validated.insert(
                        field.name.clone(),
                        field.default.clone().unwrap_or(Value::Null),
                    );
                }
                Some(Value::Null) if !field.required => {
                    validated.insert(field.name.clone(), Value::Null);
                }
                Some(value) => {
                    let accepted =
                        field
                            .field_type
                            .accept(value)
                            .ok_or_else(|| ValidationError::WrongType {
                                model: self.name.clone(),
                                field: field.name.clone(),
                                expected: field.field_type,
                                found: describe_value(value),
                            })?;
                    validated.insert(field.name.clone(), accepted);
                }
            }
        }

        for (key, value) in provided {
            if !validated.contains_key(&key) {
                validated.insert(key, value);
            }
        }

        Ok(validated)
    }

    /// JSON schema declaring this model to the LLM
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = Map::new();
            if let Some(tag) = field.field_type.tag() {
                property.insert("type".to_string(), Value::from(tag));
            }
            if !field.description.is_empty() {
                property.insert(
                    "description".to_string(),
                    Value::from(field.description.clone()),
                );
            }
            properties.insert(field.name.clone(), Value::Object(property));
        }

        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| Value::from(f.name.clone()))
            .collect();

        serde_json::json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// `search-jobs` -> `Search_JobsInput`
pub fn model_name_for_tool(tool_name: &str) -> String {
    let mut name = String::with_capacity(tool_name.len() + 5);
    let mut previous_is_letter = false;

    for ch in tool_name.replace('-', "_").chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                name.extend(ch.to_lowercase());
            } else {
                name.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            name.push(ch);
            previous_is_letter = false;
        }
    }

    name.push_str("Input");
    name
}
