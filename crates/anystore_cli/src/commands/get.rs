//! Get command implementation.

use super::json::to_json;
use super::Target;
use anystore_core::{KeyValue, StoreError};

/// Prints the value under `key` as JSON.
pub fn run(target: &Target, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = target.open()?;
    let value = store.load(key)?.ok_or_else(|| StoreError::not_found(key))?;
    println!("{}", serde_json::to_string_pretty(&to_json(&value))?);
    Ok(())
}
