//! OS randomness with bounded retries.

use crate::error::{StorageError, StorageResult};
use rand::rngs::OsRng;
use rand::RngCore;

/// Attempts made before giving up on the OS random number generator.
pub const RANDOM_RETRIES: usize = 50;

/// Fills `buf` from the OS random number generator.
///
/// # Errors
///
/// Returns [`StorageError::RandomnessUnavailable`] after
/// [`RANDOM_RETRIES`] consecutive failures.
pub fn fill_random(buf: &mut [u8]) -> StorageResult<()> {
    let mut last_error = None;
    for attempt in 1..=RANDOM_RETRIES {
        match OsRng.try_fill_bytes(buf) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::trace!(attempt, error = %e, "OS random generator failed");
                last_error = Some(e);
            }
        }
    }

    Err(StorageError::RandomnessUnavailable(format!(
        "{RANDOM_RETRIES} attempts failed, last error: {}",
        last_error.map_or_else(|| "unknown".to_string(), |e| e.to_string())
    )))
}
