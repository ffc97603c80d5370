//! New-key command implementation.

use anystore_storage::EncryptionKey;

/// Prints a fresh random 32-byte key as base64 without padding.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", EncryptionKey::generate()?.to_base64());
    Ok(())
}
