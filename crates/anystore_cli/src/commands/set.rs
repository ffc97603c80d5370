//! Set command implementation.

use super::json::from_json;
use super::Target;
use anystore_codec::Value;
use anystore_core::KeyValue;

/// Stores `value` under `key`, as text or parsed from JSON.
pub fn run(
    target: &Target,
    key: &str,
    value: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = parse_value(value, json)?;
    let store = target.open()?;
    store.store(key, value)?;
    tracing::info!(key, file = %target.file.display(), "stored");
    Ok(())
}

fn parse_value(raw: &str, json: bool) -> Result<Value, Box<dyn std::error::Error>> {
    if !json {
        return Ok(Value::from(raw));
    }
    let parsed: serde_json::Value = serde_json::from_str(raw)?;
    Ok(from_json(&parsed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn text_and_json_values() {
        assert_eq!(parse_value("42", false).unwrap(), Value::from("42"));
        assert_eq!(parse_value("42", true).unwrap(), Value::Integer(42));
        assert!(parse_value("4.2", true).is_err());
        assert!(parse_value("{", true).is_err());
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let target = Target {
            file: dir.path().join("cli.db"),
            key: None,
            authenticated: false,
        };
        run(&target, "greeting", "[1, \"two\"]", true).unwrap();

        let value = target.open().unwrap().load("greeting").unwrap();
        assert_eq!(
            value,
            Some(Value::Array(vec![Value::from(1), Value::from("two")]))
        );
    }
}
