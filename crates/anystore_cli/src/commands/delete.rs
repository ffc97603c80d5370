//! Delete command implementation.

use super::Target;
use anystore_core::KeyValue;

/// Removes `key`. Removing a missing key succeeds.
pub fn run(target: &Target, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = target.open()?;
    let existed = store.has_key(key);
    store.delete(key)?;
    tracing::info!(key, existed, file = %target.file.display(), "deleted");
    Ok(())
}
