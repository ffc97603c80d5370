//! Encryption keys for snapshot files.

use crate::error::{StorageError, StorageResult};
use crate::random::fill_random;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest accepted key, AES-256.
pub const MAX_KEY_SIZE: usize = 32;

/// Key sizes accepted by [`EncryptionKey`]: AES-128, AES-192 and AES-256.
pub const KEY_SIZES: [usize; 3] = [16, 24, 32];

/// The key used when none is configured.
///
/// This key is published in the source code and provides no secrecy at all.
/// It only keeps snapshot files from being readable at a glance.
pub const DEFAULT_ENCRYPTION_KEY: &str = "cTAvflqncVmYD7bLM31fP3TVuwEoosMMwehpIwn1P84";

/// An AES key of 16, 24 or 32 bytes.
///
/// The key is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; MAX_KEY_SIZE],
    len: usize,
}

impl EncryptionKey {
    /// Generates a random 32-byte key from the OS random number generator.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RandomnessUnavailable`] if the generator keeps
    /// failing.
    pub fn generate() -> StorageResult<Self> {
        let mut bytes = [0u8; MAX_KEY_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self {
            bytes,
            len: MAX_KEY_SIZE,
        })
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKeyLength`] unless `bytes` is 16, 24 or
    /// 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if !KEY_SIZES.contains(&bytes.len()) {
            return Err(StorageError::InvalidKeyLength {
                actual: bytes.len(),
            });
        }

        let mut key = [0u8; MAX_KEY_SIZE];
        key[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: key,
            len: bytes.len(),
        })
    }

    /// Decodes a key from standard base64 without padding.
    ///
    /// Trailing `=` padding is tolerated.
    ///
    /// # Errors
    ///
    /// Fails if the text is not base64 or does not decode to a valid key size.
    pub fn from_base64(text: &str) -> StorageResult<Self> {
        let mut raw = STANDARD_NO_PAD
            .decode(text.trim().trim_end_matches('='))
            .map_err(|e| StorageError::InvalidKeyEncoding(e.to_string()))?;
        let key = Self::from_bytes(&raw);
        raw.zeroize();
        key
    }

    /// The well-known default key, see [`DEFAULT_ENCRYPTION_KEY`].
    ///
    /// # Errors
    ///
    /// Never fails in practice; the constant is a valid 32-byte key.
    pub fn insecure_default() -> StorageResult<Self> {
        Self::from_base64(DEFAULT_ENCRYPTION_KEY)
    }

    /// Encodes the key as standard base64 without padding.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.as_bytes())
    }

    /// Returns the raw key bytes.
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length key, which no constructor produces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for EncryptionKey {}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("len", &self.len)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_decodes_to_32_bytes() {
        let key = EncryptionKey::from_base64(DEFAULT_ENCRYPTION_KEY).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(key, EncryptionKey::insecure_default().unwrap());
        assert_eq!(key.to_base64(), DEFAULT_ENCRYPTION_KEY);
    }

    #[test]
    fn accepts_aes_key_sizes_only() {
        for size in KEY_SIZES {
            assert_eq!(EncryptionKey::from_bytes(&vec![7; size]).unwrap().len(), size);
        }
        for size in [0, 10, 15, 17, 31, 33, 64] {
            assert!(matches!(
                EncryptionKey::from_bytes(&vec![7; size]),
                Err(StorageError::InvalidKeyLength { actual }) if actual == size
            ));
        }
    }

    #[test]
    fn base64_round_trip_and_padding() {
        let key = EncryptionKey::from_bytes(&[1u8; 16]).unwrap();
        let text = key.to_base64();
        assert!(!text.ends_with('='));
        assert_eq!(EncryptionKey::from_base64(&text).unwrap(), key);
        assert_eq!(EncryptionKey::from_base64(&format!("{text}==")).unwrap(), key);
    }

    #[test]
    fn rejects_garbage_text() {
        assert!(matches!(
            EncryptionKey::from_base64("not base64!"),
            Err(StorageError::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            EncryptionKey::from_base64("AAAA"),
            Err(StorageError::InvalidKeyLength { actual: 3 })
        ));
    }

    #[test]
    fn generated_keys_differ() {
        let a = EncryptionKey::generate().unwrap();
        let b = EncryptionKey::generate().unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn debug_redacts_bytes() {
        let key = EncryptionKey::insecure_default().unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
