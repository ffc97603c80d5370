//! AES-CFB encryption of snapshot files.
//!
//! Plain format: `IV (16 bytes) || ciphertext`.
//! Authenticated format: `IV (16 bytes) || ciphertext || HMAC-SHA256 (32 bytes)`,
//! where the MAC covers IV and ciphertext and its key is derived from the
//! encryption key with HKDF-SHA256.
//!
//! CFB is a stream mode, so the ciphertext is exactly as long as the
//! plaintext and no padding is involved.

use crate::error::{StorageError, StorageResult};
use crate::key::EncryptionKey;
use crate::random::fill_random;
use aes::{Aes128, Aes192, Aes256};
use cfb_mode::cipher::{AsyncStreamCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Size of the IV, one AES block.
pub const IV_SIZE: usize = 16;

/// Size of the HMAC-SHA256 tag of the authenticated format.
pub const TAG_SIZE: usize = 32;

const MAC_KEY_INFO: &[u8] = b"anystore-file-mac-v1";

type HmacSha256 = Hmac<Sha256>;

/// Encrypts `plaintext` under a fresh random IV, which is prepended.
///
/// # Errors
///
/// Fails with [`StorageError::InvalidKeyLength`] unless the key is 16, 24 or
/// 32 bytes, or with [`StorageError::RandomnessUnavailable`].
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> StorageResult<Vec<u8>> {
    check_key(key)?;

    let mut out = vec![0u8; IV_SIZE + plaintext.len()];
    fill_random(&mut out[..IV_SIZE])?;
    let (iv, body) = out.split_at_mut(IV_SIZE);
    body.copy_from_slice(plaintext);
    cfb_encrypt(key, iv, body)?;
    Ok(out)
}

/// Reverses [`encrypt`].
///
/// # Errors
///
/// Fails with [`StorageError::InvalidKeyLength`] for a bad key and
/// [`StorageError::ShortInput`] if the input cannot hold an IV.
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> StorageResult<Vec<u8>> {
    check_key(key)?;
    if ciphertext.len() < IV_SIZE {
        return Err(StorageError::ShortInput {
            len: ciphertext.len(),
            min: IV_SIZE,
        });
    }

    let (iv, body) = ciphertext.split_at(IV_SIZE);
    let mut plaintext = body.to_vec();
    cfb_decrypt(key, iv, &mut plaintext)?;
    Ok(plaintext)
}

/// Like [`encrypt`], with an HMAC-SHA256 tag appended.
///
/// # Errors
///
/// See [`encrypt`].
pub fn encrypt_authenticated(key: &[u8], plaintext: &[u8]) -> StorageResult<Vec<u8>> {
    let mut out = encrypt(key, plaintext)?;
    let tag = mac(key)?.chain_update(&out).finalize().into_bytes();
    out.extend_from_slice(&tag);
    Ok(out)
}

/// Verifies the tag, then decrypts.
///
/// # Errors
///
/// Fails with [`StorageError::ShortInput`] if the input cannot hold IV and
/// tag, and [`StorageError::AuthenticationFailed`] on tag mismatch.
pub fn decrypt_authenticated(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    check_key(key)?;
    let min = IV_SIZE + TAG_SIZE;
    if data.len() < min {
        return Err(StorageError::ShortInput {
            len: data.len(),
            min,
        });
    }

    let (sealed, tag) = data.split_at(data.len() - TAG_SIZE);
    mac(key)?
        .chain_update(sealed)
        .verify_slice(tag)
        .map_err(|_| StorageError::AuthenticationFailed)?;
    decrypt(key, sealed)
}

/// A key bound to a file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCipher {
    key: EncryptionKey,
    authenticated: bool,
}

impl SnapshotCipher {
    /// Plain CFB format.
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self {
            key,
            authenticated: false,
        }
    }

    /// CFB with an HMAC-SHA256 tag.
    #[must_use]
    pub fn authenticated(key: EncryptionKey) -> Self {
        Self {
            key,
            authenticated: true,
        }
    }

    /// The key in use.
    #[must_use]
    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    /// Whether files carry an authentication tag.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Encrypts a serialized snapshot for writing.
    ///
    /// # Errors
    ///
    /// See [`encrypt`].
    pub fn seal(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        if self.authenticated {
            encrypt_authenticated(self.key.as_bytes(), plaintext)
        } else {
            encrypt(self.key.as_bytes(), plaintext)
        }
    }

    /// Decrypts file contents. An empty file opens to an empty plaintext.
    ///
    /// # Errors
    ///
    /// See [`decrypt`] and [`decrypt_authenticated`].
    pub fn open(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if self.authenticated {
            decrypt_authenticated(self.key.as_bytes(), data)
        } else {
            decrypt(self.key.as_bytes(), data)
        }
    }
}

fn check_key(key: &[u8]) -> StorageResult<()> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        actual => Err(StorageError::InvalidKeyLength { actual }),
    }
}

fn mac(key: &[u8]) -> StorageResult<HmacSha256> {
    let mut mac_key = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha256>::new(None, key)
        .expand(MAC_KEY_INFO, &mut mac_key[..])
        .map_err(|_| StorageError::InvalidKeyLength { actual: key.len() })?;
    HmacSha256::new_from_slice(&mac_key[..])
        .map_err(|_| StorageError::InvalidKeyLength { actual: key.len() })
}

fn cfb_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> StorageResult<()> {
    match key.len() {
        16 => encrypt_with::<cfb_mode::Encryptor<Aes128>>(key, iv, buf),
        24 => encrypt_with::<cfb_mode::Encryptor<Aes192>>(key, iv, buf),
        32 => encrypt_with::<cfb_mode::Encryptor<Aes256>>(key, iv, buf),
        actual => Err(StorageError::InvalidKeyLength { actual }),
    }
}

fn cfb_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> StorageResult<()> {
    match key.len() {
        16 => decrypt_with::<cfb_mode::Decryptor<Aes128>>(key, iv, buf),
        24 => decrypt_with::<cfb_mode::Decryptor<Aes192>>(key, iv, buf),
        32 => decrypt_with::<cfb_mode::Decryptor<Aes256>>(key, iv, buf),
        actual => Err(StorageError::InvalidKeyLength { actual }),
    }
}

fn encrypt_with<E>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> StorageResult<()>
where
    E: KeyIvInit + AsyncStreamCipher + BlockEncryptMut,
{
    let cipher = E::new_from_slices(key, iv)
        .map_err(|_| StorageError::InvalidKeyLength { actual: key.len() })?;
    cipher.encrypt(buf);
    Ok(())
}

fn decrypt_with<D>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> StorageResult<()>
where
    D: KeyIvInit + AsyncStreamCipher + BlockDecryptMut,
{
    let cipher = D::new_from_slices(key, iv)
        .map_err(|_| StorageError::InvalidKeyLength { actual: key.len() })?;
    cipher.decrypt(buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn round_trip_all_key_sizes() {
        for len in [16, 24, 32] {
            let key = key(len);
            for data in [&b""[..], b"x", b"exactly sixteen!", b"a longer message spanning blocks"] {
                let sealed = encrypt(&key, data).unwrap();
                assert_eq!(sealed.len(), IV_SIZE + data.len());
                assert_eq!(decrypt(&key, &sealed).unwrap(), data);
            }
        }
    }

    #[test]
    fn bad_key_length_rejected() {
        let key = key(10);
        assert!(matches!(
            encrypt(&key, b"data"),
            Err(StorageError::InvalidKeyLength { actual: 10 })
        ));
        assert!(matches!(
            decrypt(&key, &[0u8; 32]),
            Err(StorageError::InvalidKeyLength { actual: 10 })
        ));
    }

    #[test]
    fn short_input_rejected() {
        assert!(matches!(
            decrypt(&key(16), &[0u8; 15]),
            Err(StorageError::ShortInput { len: 15, min: 16 })
        ));
        assert_eq!(decrypt(&key(16), &[0u8; 16]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn fresh_iv_per_call() {
        let key = key(32);
        let a = encrypt(&key, b"same plaintext").unwrap();
        let b = encrypt(&key, b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn known_aes128_cfb_vector() {
        // NIST SP 800-38A F.3.13, CFB128-AES128, first block.
        let key = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf,
            0x4f, 0x3c,
        ];
        let iv: Vec<u8> = (0u8..16).collect();
        let plaintext = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        let expected = [
            0x3b, 0x3f, 0xd9, 0x2e, 0xb7, 0x2d, 0xad, 0x20, 0x33, 0x34, 0x49, 0xf8, 0xe8, 0x3c,
            0xfb, 0x4a,
        ];

        let mut sealed = iv.clone();
        sealed.extend_from_slice(&expected);
        assert_eq!(decrypt(&key, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn authenticated_round_trip_and_tamper() {
        let key = key(32);
        let sealed = encrypt_authenticated(&key, b"payload").unwrap();
        assert_eq!(sealed.len(), IV_SIZE + 7 + TAG_SIZE);
        assert_eq!(decrypt_authenticated(&key, &sealed).unwrap(), b"payload");

        let mut tampered = sealed.clone();
        tampered[IV_SIZE] ^= 1;
        assert!(matches!(
            decrypt_authenticated(&key, &tampered),
            Err(StorageError::AuthenticationFailed)
        ));

        let mut other = key.clone();
        other[0] ^= 1;
        assert!(matches!(
            decrypt_authenticated(&other, &sealed),
            Err(StorageError::AuthenticationFailed)
        ));

        assert!(matches!(
            decrypt_authenticated(&key, &sealed[..IV_SIZE + TAG_SIZE - 1]),
            Err(StorageError::ShortInput { .. })
        ));
    }

    #[test]
    fn snapshot_cipher_opens_empty_file() {
        let key = EncryptionKey::from_bytes(&key(24)).unwrap();
        for cipher in [SnapshotCipher::new(key.clone()), SnapshotCipher::authenticated(key)] {
            assert!(cipher.open(&[]).unwrap().is_empty());
            let sealed = cipher.seal(b"snapshot").unwrap();
            assert_eq!(cipher.open(&sealed).unwrap(), b"snapshot");
        }
    }

    proptest! {
        #[test]
        fn any_data_round_trips(
            len in prop::sample::select(vec![16usize, 24, 32]),
            data in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let key = key(len);
            let sealed = encrypt(&key, &data).unwrap();
            prop_assert_eq!(decrypt(&key, &sealed).unwrap(), data);
        }
    }
}
