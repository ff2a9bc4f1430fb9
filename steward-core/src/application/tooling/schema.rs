use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::error::SchemaValidationError;
use crate::domain::{ArgValue, ToolArguments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (SchemaType::String, Value::String(_)) => true,
            (SchemaType::Number, Value::Number(_)) => true,
            (SchemaType::Integer, Value::Number(number)) => {
                number.is_i64()
                    || number.is_u64()
                    || number.as_f64().map(|n| n.fract() == 0.0).unwrap_or(false)
            }
            (SchemaType::Boolean, Value::Bool(_)) => true,
            (SchemaType::Array, Value::Array(_)) => true,
            (SchemaType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            enum_values: None,
            items: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(SchemaType::String).describe(description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Integer).describe(description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Number).describe(description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Boolean).describe(description)
    }

    pub fn array_of(items: PropertySchema, description: impl Into<String>) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(SchemaType::Array).describe(description)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn check(&self, path: &str, value: &Value) -> Result<(), SchemaValidationError> {
        if !self.kind.accepts(value) {
            return Err(SchemaValidationError::TypeMismatch {
                argument: path.to_string(),
                expected: self.kind.as_str(),
                found: json_type(value),
            });
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                let rendered = serde_json::to_string(allowed).unwrap_or_default();
                return Err(SchemaValidationError::NotInEnum {
                    argument: path.to_string(),
                    allowed: rendered,
                });
            }
        }

        if let (Some(items), Value::Array(values)) = (&self.items, value) {
            for (position, item) in values.iter().enumerate() {
                items.check(&format!("{path}[{position}]"), item)?;
            }
        }

        Ok(())
    }
}

/// Object-shaped parameter schema for a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn required_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    /// JSON Schema rendering sent to model providers.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
            "additionalProperties": false,
        })
    }

    /// Checks a raw model payload and converts it into typed arguments.
    ///
    /// `null` is accepted as an empty argument object.
    pub fn validate(&self, raw: &Value) -> Result<ToolArguments, SchemaValidationError> {
        let empty = serde_json::Map::new();
        let object = match raw {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(SchemaValidationError::NotAnObject {
                    found: json_type(other),
                });
            }
        };

        for key in object.keys() {
            if !self.properties.contains_key(key) {
                return Err(SchemaValidationError::UnknownArgument {
                    argument: key.clone(),
                });
            }
        }

        for name in &self.required {
            match object.get(name) {
                None | Some(Value::Null) => {
                    return Err(SchemaValidationError::MissingArgument {
                        argument: name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let mut typed = BTreeMap::new();
        for (name, value) in object {
            // Optional arguments explicitly sent as null are treated as absent.
            if value.is_null() {
                continue;
            }
            if let Some(schema) = self.properties.get(name) {
                schema.check(name, value)?;
            }
            typed.insert(name.clone(), ArgValue::from_json(value));
        }

        Ok(ToolArguments::from_map(typed))
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
