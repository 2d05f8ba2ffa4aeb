//! Conversion between serde types and DynamoDB items.

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::error::{SessionError, SessionResult};

/// A DynamoDB item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// Encode a serializable struct as an item.
pub fn to_item<T: Serialize>(value: &T) -> SessionResult<Item> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields
            .into_iter()
            .map(|(name, field)| (name, to_attribute(field)))
            .collect()),
        Ok(other) => Err(SessionError::Serialization(format!(
            "expected a map-like value, got {}",
            kind(&other)
        ))),
        Err(e) => Err(SessionError::Serialization(e.to_string())),
    }
}

/// Decode an item into a deserializable struct.
pub fn from_item<T: DeserializeOwned>(item: Item) -> SessionResult<T> {
    let mut fields = Map::with_capacity(item.len());
    for (name, attribute) in item {
        let value = from_attribute(attribute)
            .map_err(|e| SessionError::Deserialization(format!("attribute '{name}': {e}")))?;
        fields.insert(name, value);
    }
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| SessionError::Deserialization(e.to_string()))
}

/// Encode a single JSON value as an attribute value.
pub fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .into_iter()
                .map(|(name, field)| (name, to_attribute(field)))
                .collect(),
        ),
    }
}

fn from_attribute(attribute: AttributeValue) -> Result<Value, String> {
    Ok(match attribute {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::L(values) => Value::Array(
            values
                .into_iter()
                .map(from_attribute)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, field)| from_attribute(field).map(|v| (name, v)))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            return Err("binary attributes are not supported".to_string());
        }
        other => return Err(format!("unsupported attribute type: {other:?}")),
    })
}

fn parse_number(n: &str) -> Result<Number, String> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Number::from(u));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("invalid number '{n}'"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
