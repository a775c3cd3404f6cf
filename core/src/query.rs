//! URL-encoded serialization of parameter maps.
//!
//! Query strings and form bodies share one encoding: scalars map to
//! `key=value`, nested objects and arrays expand with bracket notation
//! (`filter[status]=open`, `ids[0]=1`), booleans become `1`/`0` and nulls are
//! skipped. The flattened pairs are handed to `serde_urlencoded`.

use serde_json::{Map, Value};

use crate::error::ApiError;

/// Encode a parameter map as `application/x-www-form-urlencoded`.
pub fn encode(params: &Map<String, Value>) -> Result<String, ApiError> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }
    serde_urlencoded::to_string(&pairs).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => out.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{key}[{index}]"), item, out);
            }
        }
        Value::Object(fields) => {
            for (name, item) in fields {
                flatten(format!("{key}[{name}]"), item, out);
            }
        }
    }
}
