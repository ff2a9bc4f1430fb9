//! Typed tool arguments.
//!
//! Models hand back arbitrary JSON. Before a tool sees it, the payload is
//! checked against the tool's [`ParameterSchema`](crate::tooling::ParameterSchema)
//! and converted into the closed [`ArgValue`] type below.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ArgValue>),
    Object(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "boolean",
            ArgValue::Number(_) => "number",
            ArgValue::String(_) => "string",
            ArgValue::Array(_) => "array",
            ArgValue::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Null => Value::Null,
            ArgValue::Bool(flag) => Value::Bool(*flag),
            ArgValue::Number(number) => Value::Number(number.clone()),
            ArgValue::String(text) => Value::String(text.clone()),
            ArgValue::Array(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Structural conversion. Schema checks happen in the caller.
    pub(crate) fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ArgValue::Null,
            Value::Bool(flag) => ArgValue::Bool(*flag),
            Value::Number(number) => ArgValue::Number(number.clone()),
            Value::String(text) => ArgValue::String(text.clone()),
            Value::Array(items) => ArgValue::Array(items.iter().map(ArgValue::from_json).collect()),
            Value::Object(map) => ArgValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), ArgValue::from_json(value)))
                    .collect(),
            ),
        }
    }
}

/// Validated arguments for a single tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolArguments(BTreeMap<String, ArgValue>);

impl ToolArguments {
    pub(crate) fn from_map(map: BTreeMap<String, ArgValue>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ArgValue::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ArgValue::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        ArgValue::Object(self.0.clone()).to_json()
    }
}
