//! Converting between store values and JSON.
//!
//! Byte buffers appear as `{"$bytes": "<base64>"}`. Maps whose keys are all
//! text become JSON objects; other maps become arrays of `[key, value]`
//! pairs.

use anystore_codec::Value;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

const BYTES_TAG: &str = "$bytes";

/// Renders a value as JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::Number(Number::from(*n)),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => {
            let mut object = Map::new();
            object.insert(BYTES_TAG.to_string(), Json::String(STANDARD_NO_PAD.encode(b)));
            Json::Object(object)
        }
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            if pairs.iter().all(|(k, _)| k.as_text().is_some()) {
                Json::Object(
                    pairs
                        .iter()
                        .filter_map(|(k, v)| Some((k.as_text()?.to_string(), to_json(v))))
                        .collect(),
                )
            } else {
                Json::Array(
                    pairs
                        .iter()
                        .map(|(k, v)| Json::Array(vec![to_json(k), to_json(v)]))
                        .collect(),
                )
            }
        }
    }
}

/// Parses JSON into a value.
///
/// # Errors
///
/// Fails on floats and integers outside the `i64` range, and on malformed
/// `$bytes` objects.
pub fn from_json(json: &Json) -> Result<Value, String> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Integer(
            n.as_i64()
                .ok_or_else(|| format!("{n} is not an integer in the i64 range"))?,
        ),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect::<Result<_, _>>()?),
        Json::Object(object) => {
            if let (1, Some(Json::String(encoded))) = (object.len(), object.get(BYTES_TAG)) {
                let bytes = STANDARD_NO_PAD
                    .decode(encoded.trim_end_matches('='))
                    .map_err(|e| format!("invalid {BYTES_TAG}: {e}"))?;
                return Ok(Value::Bytes(bytes));
            }
            let pairs = object
                .iter()
                .map(|(k, v)| Ok((Value::Text(k.clone()), from_json(v)?)))
                .collect::<Result<Vec<_>, String>>()?;
            Value::map(pairs)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(to_json(&Value::Null), json!(null));
        assert_eq!(to_json(&Value::Integer(-3)), json!(-3));
        assert_eq!(to_json(&Value::from("hi")), json!("hi"));
        assert_eq!(to_json(&Value::Bytes(vec![1, 2, 3])), json!({"$bytes": "AQID"}));
    }

    #[test]
    fn maps() {
        let text_keys = Value::map(vec![(Value::from("a"), Value::from(1))]);
        assert_eq!(to_json(&text_keys), json!({"a": 1}));

        let mixed = Value::map(vec![(Value::Integer(1), Value::from("one"))]);
        assert_eq!(to_json(&mixed), json!([[1, "one"]]));
    }

    #[test]
    fn parse_nested() {
        let value = from_json(&json!({"name": "Alice", "tags": ["x", null], "raw": {"$bytes": "AQID"}}))
            .unwrap();
        assert_eq!(value.get("name"), Some(&Value::from("Alice")));
        assert_eq!(
            value.get("tags"),
            Some(&Value::Array(vec![Value::from("x"), Value::Null]))
        );
        assert_eq!(value.get("raw"), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(to_json(&value)["name"], json!("Alice"));
    }

    #[test]
    fn floats_rejected() {
        assert!(from_json(&json!(1.5)).is_err());
        assert!(from_json(&json!(u64::MAX)).is_err());
    }
}
