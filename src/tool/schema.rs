// ABOUTME: Declared parameter schema for a tool and argument validation against it.
// ABOUTME: Validation checks required fields, types, allowed values and unknown keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ValidationError;

/// Primitive kind of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    /// Coerce a JSON value into this kind, if it can be done losslessly.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamKind::String, Value::String(_)) => Some(value.clone()),
            (ParamKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),

            (ParamKind::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(json!(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| json!(f as i64))
                }
            }
            (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| json!(i)),

            (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
            (ParamKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| json!(f)),

            (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            (ParamKind::Array, Value::Array(_)) => Some(value.clone()),
            (ParamKind::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Enumerated allowed values; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
}

/// The declared shape of a tool: its parameters and what it returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter.
    pub fn required(mut self, name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
            allowed: Vec::new(),
        });
        self
    }

    /// Declare an optional parameter.
    pub fn optional(mut self, name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
            allowed: Vec::new(),
        });
        self
    }

    /// Restrict the most recently declared parameter to an enumerated set.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if let Some(last) = self.params.last_mut() {
            last.allowed = values.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Describe the return payload (JSON Schema fragment).
    pub fn returns(mut self, shape: Value) -> Self {
        self.returns = Some(shape);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render as a JSON Schema object for oracle tool definitions.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for p in &self.params {
            let mut prop = json!({ "type": p.kind.as_str() });
            if !p.description.is_empty() {
                prop["description"] = json!(p.description);
            }
            if !p.allowed.is_empty() {
                prop["enum"] = Value::Array(p.allowed.clone());
            }
            properties.insert(p.name.clone(), prop);
            if p.required {
                required.push(json!(p.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Validate `arguments` for the tool `tool`, returning the coerced argument map.
    ///
    /// A `null` optional argument is treated as absent. Unknown keys are rejected.
    pub fn validate(&self, tool: &str, arguments: &Value) -> Result<Map<String, Value>, ValidationError> {
        let empty = Map::new();
        let given = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ValidationError::NotAnObject { tool: tool.to_string() });
            }
        };

        if let Some(unknown) = given.keys().find(|k| self.param(k).is_none()) {
            return Err(ValidationError::UnknownField {
                tool: tool.to_string(),
                field: unknown.clone(),
            });
        }

        let mut coerced = Map::new();
        for spec in &self.params {
            let value = match given.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ValidationError::MissingField {
                            tool: tool.to_string(),
                            field: spec.name.clone(),
                        });
                    }
                    continue;
                }
                Some(v) => v,
            };

            let value = spec.kind.coerce(value).ok_or_else(|| ValidationError::TypeMismatch {
                tool: tool.to_string(),
                field: spec.name.clone(),
                expected: spec.kind.as_str().to_string(),
                found: json_kind(value).to_string(),
            })?;

            if !spec.allowed.is_empty() && !spec.allowed.contains(&value) {
                return Err(ValidationError::NotAllowed {
                    tool: tool.to_string(),
                    field: spec.name.clone(),
                    allowed: Value::Array(spec.allowed.clone()).to_string(),
                });
            }

            coerced.insert(spec.name.clone(), value);
        }

        Ok(coerced)
    }
}
