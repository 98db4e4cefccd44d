//! Helpers for moving values between attributes and API payloads

use std::collections::HashMap;

use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::Value;

use crate::client::ApiError;

pub type Attributes = HashMap<String, Value>;

pub fn get_string(attrs: &Attributes, key: &str) -> Option<String> {
    attrs.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn get_bool(attrs: &Attributes, key: &str) -> Option<bool> {
    attrs.get(key).and_then(Value::as_bool)
}

pub fn get_int(attrs: &Attributes, key: &str) -> Option<i64> {
    attrs.get(key).and_then(Value::as_int)
}

pub fn get_string_list(attrs: &Attributes, key: &str) -> Vec<String> {
    match attrs.get(key) {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// String attribute the schema marks as required
pub fn require_string(attrs: &Attributes, key: &str) -> ProviderResult<String> {
    get_string(attrs, key)
        .ok_or_else(|| ProviderError::new(format!("Missing required attribute '{}'", key)))
}

/// Set or, for `None`, remove an attribute
pub fn set_string(attrs: &mut Attributes, key: &str, value: Option<impl Into<String>>) {
    match value {
        Some(v) => {
            attrs.insert(key.to_string(), Value::String(v.into()));
        }
        None => {
            attrs.remove(key);
        }
    }
}

pub fn set_bool(attrs: &mut Attributes, key: &str, value: Option<bool>) {
    match value {
        Some(v) => {
            attrs.insert(key.to_string(), Value::Bool(v));
        }
        None => {
            attrs.remove(key);
        }
    }
}

pub fn string_list(values: &[String]) -> Value {
    Value::List(values.iter().cloned().map(Value::String).collect())
}

/// `<summary>: <status>: <body>`
pub fn api_error(summary: &str, err: ApiError) -> ProviderError {
    let message = format!("{}: {}", summary, err);
    ProviderError::new(message).with_cause(err)
}
