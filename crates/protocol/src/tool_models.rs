//! Tool schema models.
//!
//! A [`ToolSchema`] describes a callable that an agent may ask the
//! orchestrator to run. Arguments arrive as a JSON object and are checked
//! with [`ToolSchema::validate`] before the callable is invoked.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use ts_rs::TS;

/// JSON type of a tool parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Name used in JSON Schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` is an instance of this type.
    ///
    /// Integers are accepted where a number is expected.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// A single parameter of a tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,

    #[serde(default)]
    pub description: String,

    /// Required parameters must be present in every call.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ParamSpec {
    pub fn required(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: false,
        }
    }
}

/// Declaration of a tool: `{name, description, parameters}`.
///
/// # Example
///
/// ```rust
/// use tk_protocol::tool_models::{ParamSpec, ParamType, ToolSchema};
///
/// let schema = ToolSchema::new("refund_flight", "Refund a flight")
///     .with_param("flight_id", ParamSpec::required(ParamType::String, "Booking reference"));
/// assert!(schema.validate(&serde_json::json!({"flight_id": "XY123"})).is_ok());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ToolSchema {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Parameters by name, kept in a stable order for rendering.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Check that `arguments` conforms to this schema.
    ///
    /// Arguments must be a JSON object (or `null` for tools without required
    /// parameters). Every required parameter must be present and every known
    /// parameter must have the declared type. Unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first violation found.
    pub fn validate(&self, arguments: &Value) -> Result<(), String> {
        let empty = Map::new();
        let object = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(format!(
                    "arguments for '{}' must be an object, got {}",
                    self.name,
                    json_type_name(other)
                ))
            }
        };

        for (name, spec) in &self.parameters {
            match object.get(name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(format!("missing required parameter '{name}'"));
                }
                Some(value) if !value.is_null() && !spec.param_type.accepts(value) => {
                    return Err(format!(
                        "parameter '{name}' must be of type {}, got {}",
                        spec.param_type.as_str(),
                        json_type_name(value)
                    ));
                }
                _ => {}
            }
        }

        if let Some(unknown) = object.keys().find(|k| !self.parameters.contains_key(*k)) {
            return Err(format!("unknown parameter '{unknown}'"));
        }

        Ok(())
    }

    /// Render the OpenAI-style function declaration for this tool.
    pub fn to_function_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    json!({
                        "type": spec.param_type.as_str(),
                        "description": spec.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&String> = self
            .parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name)
            .collect();

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
