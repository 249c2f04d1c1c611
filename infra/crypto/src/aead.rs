use crate::error::CryptoError;
use crate::secret::SecretKey;
use aead::inout::InOutBuf;
use aead::{AeadInOut, Key, KeyInit, Nonce};
use aes_gcm::Aes256Gcm;
use std::fmt;

/// Sealed blob format version.
pub(crate) const BLOB_VERSION_V1: u8 = 1;

/// `[version: u8][flags: u8]`
pub(crate) const HEADER_LEN: usize = 2;

/// AES-GCM nonce length (96-bit).
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length (128-bit).
pub(crate) const TAG_LEN: usize = 16;

/// The nonce was derived from the plaintext rather than drawn at random.
pub(crate) const FLAG_SYNTHETIC_NONCE: u8 = 1 << 0;

pub(crate) const MIN_BLOB_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

/// AES-256-GCM sealing key.
///
/// Blobs are laid out as:
///
/// ```text
/// [V(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
/// ```
///
/// [`SealingKey::seal`] draws a random nonce per call. Nonce choice for deterministic
/// encryption is left to [`crate::det`], which marks its blobs with a flag.
pub struct SealingKey {
    cipher: Aes256Gcm,
}

impl SealingKey {
    /// # Errors
    /// [`CryptoError::InvalidKey`] if the key cannot initialise AES-256.
    pub fn new(key: &SecretKey) -> Result<Self, CryptoError> {
        let key = Key::<Aes256Gcm>::try_from(&key.expose()[..]).map_err(|_| {
            CryptoError::InvalidKey { message: "AES-256 key must be 32 bytes".into(), context: None }
        })?;
        Ok(Self { cipher: Aes256Gcm::new(&key) })
    }

    fn random_nonce() -> Result<Nonce<Aes256Gcm>, CryptoError> {
        let mut nonce = Nonce::<Aes256Gcm>::default();
        getrandom::fill(&mut nonce)?;
        Ok(nonce)
    }

    /// Encrypts `plaintext` under a fresh random nonce, binding `aad`.
    ///
    /// # Errors
    /// [`CryptoError::Entropy`] or [`CryptoError::Encryption`].
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Self::random_nonce()?;
        self.seal_with_nonce(&nonce, 0, plaintext, aad)
    }

    pub(crate) fn seal_with_nonce(
        &self,
        nonce: &Nonce<Aes256Gcm>,
        flags: u8,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut buf = Vec::with_capacity(MIN_BLOB_LEN + plaintext.len());
        buf.push(BLOB_VERSION_V1);
        buf.push(flags);
        buf.extend_from_slice(nonce);
        buf.extend_from_slice(plaintext);

        let data = &mut buf[HEADER_LEN + NONCE_LEN..];
        let tag = self
            .cipher
            .encrypt_inout_detached(nonce, aad, InOutBuf::from(data))
            .map_err(|_| CryptoError::Encryption {
                message: "AEAD encryption failed".into(),
                context: None,
            })?;

        buf.extend_from_slice(tag.as_slice());
        Ok(buf)
    }

    /// Authenticates and decrypts a blob produced by this key.
    ///
    /// # Errors
    /// * [`CryptoError::InvalidCiphertext`] for a truncated blob or unknown version.
    /// * [`CryptoError::Decryption`] if authentication fails.
    pub fn open(&self, blob: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.open_parts(blob, aad)?.plaintext)
    }

    pub(crate) fn open_parts<'a>(
        &self,
        blob: &'a [u8],
        aad: &[u8],
    ) -> Result<OpenedBlob<'a>, CryptoError> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(CryptoError::InvalidCiphertext {
                message: format!(
                    "blob too short ({} bytes), expected at least {MIN_BLOB_LEN}",
                    blob.len()
                )
                .into(),
                context: None,
            });
        }

        let (header, rest) = blob.split_at(HEADER_LEN);
        if header[0] != BLOB_VERSION_V1 {
            return Err(CryptoError::InvalidCiphertext {
                message: "unsupported blob version".into(),
                context: Some(format!("version={}", header[0]).into()),
            });
        }

        let (nonce_bytes, rest) = rest.split_at(NONCE_LEN);
        let (ciphertext, tag_bytes) = rest.split_at(rest.len() - TAG_LEN);

        let nonce = Nonce::<Aes256Gcm>::try_from(nonce_bytes).map_err(|_| {
            CryptoError::Decryption { message: "invalid nonce length".into(), context: None }
        })?;
        let tag = tag_bytes.try_into().map_err(|_| CryptoError::Decryption {
            message: "invalid tag length".into(),
            context: None,
        })?;

        let mut plaintext = ciphertext.to_vec();
        self.cipher
            .decrypt_inout_detached(&nonce, aad, InOutBuf::from(&mut plaintext[..]), &tag)
            .map_err(|_| CryptoError::Decryption {
                message: "AEAD authentication failed".into(),
                context: None,
            })?;

        Ok(OpenedBlob { flags: header[1], nonce: nonce_bytes, plaintext })
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingKey").field("cipher", &"AES-256-GCM").finish()
    }
}

pub(crate) struct OpenedBlob<'a> {
    pub(crate) flags: u8,
    pub(crate) nonce: &'a [u8],
    pub(crate) plaintext: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SealingKey {
        SealingKey::new(&SecretKey::from_bytes([9; 32])).unwrap()
    }

    #[test]
    fn test_seal_open_round_trip() {
        let key = key();
        let blob = key.seal(b"hello", b"ctx").unwrap();
        assert_eq!(blob.len(), MIN_BLOB_LEN + 5);
        assert_eq!(blob[0], BLOB_VERSION_V1);
        assert_eq!(key.open(&blob, b"ctx").unwrap(), b"hello");
    }

    #[test]
    fn test_random_nonces_differ() {
        let key = key();
        assert_ne!(key.seal(b"same", b"").unwrap(), key.seal(b"same", b"").unwrap());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = key();
        let blob = key.seal(b"hello", b"ctx").unwrap();
        assert!(matches!(key.open(&blob, b"other"), Err(CryptoError::Decryption { .. })));
    }

    #[test]
    fn test_tampered_byte_fails() {
        let key = key();
        let mut blob = key.seal(b"hello", b"").unwrap();
        let idx = HEADER_LEN + NONCE_LEN;
        blob[idx] ^= 0x01;
        assert!(matches!(key.open(&blob, b""), Err(CryptoError::Decryption { .. })));
    }

    #[test]
    fn test_short_and_versioned_blobs_rejected() {
        let key = key();
        assert!(matches!(key.open(&[1, 0, 3], b""), Err(CryptoError::InvalidCiphertext { .. })));

        let mut blob = key.seal(b"x", b"").unwrap();
        blob[0] = 9;
        assert!(matches!(key.open(&blob, b""), Err(CryptoError::InvalidCiphertext { .. })));
    }
}
