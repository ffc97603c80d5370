//! Keys and len command implementations.

use super::json::to_json;
use super::Target;
use anystore_core::KeyValue;
use serde_json::Value as Json;

/// Prints every key as a JSON array.
pub fn keys(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    let keys = target.open()?.keys()?;
    let rendered = Json::Array(keys.iter().map(to_json).collect());
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

/// Prints the number of entries.
pub fn len(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", target.open()?.len()?);
    Ok(())
}
