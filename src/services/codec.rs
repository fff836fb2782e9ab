//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore documents carry every value wrapped in a type tag
//! (`{"stringValue": "x"}`, `{"integerValue": "5"}`, ...). Integers travel
//! as decimal strings.

use serde_json::{Map, Number, Value};

/// Encode a plain JSON value as a Firestore `Value`
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                serde_json::json!({ "integerValue": u.to_string() })
            } else {
                serde_json::json!({ "doubleValue": n.as_f64().unwrap_or(0.0) })
            }
        }
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            serde_json::json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => serde_json::json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode each entry of a JSON object, producing a Firestore `fields` map
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(fields)
}

/// Decode a Firestore `Value` back into plain JSON
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected typed value object, got {}", value))?;

    let (tag, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("bad booleanValue: {}", inner)),
        "integerValue" => {
            // Emitted as a string, but accept a bare number as well
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| format!("bad integerValue: {}", inner))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("bad doubleValue: {}", inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values.as_slice(),
                None => &[],
                Some(other) => return Err(format!("bad arrayValue: {}", other)),
            };
            values
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => decode_fields(inner.get("fields")),
        other => Err(format!("unsupported value type: {}", other)),
    }
}

/// Decode a Firestore `fields` map (absent means an empty document)
pub fn decode_fields(fields: Option<&Value>) -> Result<Value, String> {
    let Some(fields) = fields else {
        return Ok(Value::Object(Map::new()));
    };
    let map = fields
        .as_object()
        .ok_or_else(|| format!("expected fields object, got {}", fields))?;

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        out.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Object(out))
}
