/// Declarative input schemas and boundary validation
///
/// Tools declare the parameters they accept with a small JSON-Schema-shaped
/// `InputSchema`. Its JSON form is compiled with `jsonschema` once per tool;
/// the dispatch facade validates raw parameters against it and hands tools a
/// `ValidatedParams`, so nothing past the boundary sees raw input.

use crate::error::{SchemaError, SchemaViolation, ValidationError};
use jsonschema::{error::ValidationErrorKind, JSONSchema};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, sync::Arc};

/// JSON value kinds a property can be constrained to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shape of a single named parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element shape for array properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn of(kind: ValueKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of(ValueKind::String)
    }

    pub fn boolean() -> Self {
        Self::of(ValueKind::Boolean)
    }

    pub fn integer() -> Self {
        Self::of(ValueKind::Integer)
    }

    pub fn object() -> Self {
        Self::of(ValueKind::Object)
    }

    pub fn array_of(items: PropertySchema) -> Self {
        Self {
            kind: Some(ValueKind::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of<I, V>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    /// Value filled in after validation when the caller omits the property
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

fn object_type() -> String {
    "object".to_string()
}

fn default_true() -> bool {
    true
}

/// Accepted parameter shape of a tool
///
/// Always describes an object; `additionalProperties` defaults to true like in
/// JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSchema {
    #[serde(rename = "type", default = "object_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default = "default_true")]
    pub additional_properties: bool,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl InputSchema {
    /// Empty object schema accepting anything
    pub fn object() -> Self {
        Self {
            kind: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }

    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Reject parameters not declared in `properties`
    pub fn strict(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    /// Compile the JSON Schema form of this schema for `tool`
    pub fn compile(&self, tool: &str) -> Result<SchemaValidator, SchemaError> {
        let invalid = |message: String| SchemaError {
            tool: tool.to_string(),
            message,
        };

        let document = serde_json::to_value(self).map_err(|e| invalid(e.to_string()))?;
        let compiled = JSONSchema::compile(&document).map_err(|e| invalid(e.to_string()))?;

        let defaults = self
            .properties
            .iter()
            .filter_map(|(name, property)| property.default.clone().map(|value| (name.clone(), value)))
            .collect();

        Ok(SchemaValidator {
            tool: tool.to_string(),
            defaults,
            compiled: Arc::new(compiled),
        })
    }

    /// One-off validation; registered tools reuse their compiled validator
    pub fn validate(&self, tool: &str, params: Value) -> Result<ValidatedParams, ValidationError> {
        let validator = self.compile(tool).map_err(|e| ValidationError {
            tool: tool.to_string(),
            violations: vec![SchemaViolation {
                path: String::new(),
                message: e.message,
            }],
        })?;
        validator.validate(params)
    }
}

/// Compiled input schema of one tool
#[derive(Clone)]
pub struct SchemaValidator {
    tool: String,
    /// Declared defaults, applied once validation passed
    defaults: Vec<(String, Value)>,
    compiled: Arc<JSONSchema>,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("tool", &self.tool)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl SchemaValidator {
    /// Validate raw parameters, then fill in declared defaults
    ///
    /// `null` is accepted as an empty parameter object.
    pub fn validate(&self, params: Value) -> Result<ValidatedParams, ValidationError> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ValidationError {
                    tool: self.tool.clone(),
                    violations: vec![SchemaViolation {
                        path: String::new(),
                        message: format!("parameters must be an object, found {}", describe_value(&other)),
                    }],
                })
            }
        };

        let instance = Value::Object(params);
        let mut violations: Vec<SchemaViolation> = match self.compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.flat_map(violations_of).collect(),
        };

        if !violations.is_empty() {
            violations.sort_by(|a, b| a.path.cmp(&b.path));
            violations.dedup();
            return Err(ValidationError {
                tool: self.tool.clone(),
                violations,
            });
        }

        let mut params = match instance {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (name, default) in &self.defaults {
            params.entry(name.clone()).or_insert_with(|| default.clone());
        }

        Ok(ValidatedParams(params))
    }
}

/// Translate one `jsonschema` error into violations pointing at the offending key
fn violations_of(error: jsonschema::ValidationError<'_>) -> Vec<SchemaViolation> {
    let path = error.instance_path.to_string();
    match &error.kind {
        ValidationErrorKind::Required { property } => vec![SchemaViolation {
            path: format!("{}/{}", path, property.as_str().unwrap_or_default()),
            message: "required parameter is missing".to_string(),
        }],
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| SchemaViolation {
                path: format!("{}/{}", path, name),
                message: "unknown parameter".to_string(),
            })
            .collect(),
        _ => vec![SchemaViolation {
            path,
            message: error.to_string(),
        }],
    }
}

/// Parameters that passed schema validation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedParams(Map<String, Value>);

impl ValidatedParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Integer parameter; integral floats such as `1.0` count as integers
    pub fn i64(&self, key: &str) -> Option<i64> {
        let value = self.0.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64)
                .map(|n| n as i64)
        })
    }

    /// Deserialize the whole parameter object into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
