//! The backend answers with `T[]`, `{posts: T[]}` or `{data: T[]}` depending
//! on the endpoint and its version. Every response passes through here once,
//! so callers only ever see plain values.

use serde::de::{DeserializeOwned, Error};
use serde_json::Value;
use tracing::warn;

pub const DATA_KEY: &str = "data";

/// Extracts a collection from `value`, looking under `key` and then `data`
/// when the payload is wrapped. Malformed items are skipped.
pub fn collection<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, serde_json::Error> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            match object.remove(key).or_else(|| object.remove(DATA_KEY)) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(serde_json::Error::custom(format!(
                        "expected an array under \"{key}\", found {}",
                        kind(&other)
                    )));
                }
                None if object.is_empty() => Vec::new(),
                None => {
                    return Err(serde_json::Error::custom(format!(
                        "expected an array or an object with \"{key}\" or \"{DATA_KEY}\""
                    )));
                }
            }
        }
        Value::Null => Vec::new(),
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected a collection, found {}",
                kind(&other)
            )));
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(key, index, error = %err, "Skipping malformed item");
                None
            }
        })
        .collect())
}

/// Extracts a single entity from `value`, unwrapping `{key: T}` or `{data: T}`.
pub fn entity<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, serde_json::Error> {
    let value = match value {
        Value::Object(mut object) if object.contains_key(key) || object.contains_key(DATA_KEY) => {
            object
                .remove(key)
                .or_else(|| object.remove(DATA_KEY))
                .unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(value)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
