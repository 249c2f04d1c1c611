//! Deterministic encryption with a synthetic nonce.
//!
//! The AES-GCM nonce is the truncated HMAC of the plaintext, so the same key and
//! plaintext always give the same blob. Equality of plaintexts is therefore visible
//! to whoever holds the ciphertexts; nothing else is.

use crate::aead::{FLAG_SYNTHETIC_NONCE, NONCE_LEN, SealingKey};
use crate::error::CryptoError;
use crate::mac::MacKey;
use crate::secret::SecretKey;
use aead::Nonce;
use aes_gcm::Aes256Gcm;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const DET_AAD: &[u8] = b"veil.det.v1";

#[derive(Debug)]
pub struct DeterministicCipher {
    sealer: SealingKey,
    siv: MacKey,
}

impl DeterministicCipher {
    /// `enc_key` drives AES-256-GCM, `nonce_key` derives the synthetic nonce.
    ///
    /// # Errors
    /// [`CryptoError::InvalidKey`] for unusable key material.
    pub fn new(enc_key: &SecretKey, nonce_key: &SecretKey) -> Result<Self, CryptoError> {
        Ok(Self { sealer: SealingKey::new(enc_key)?, siv: MacKey::new(nonce_key)? })
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<Nonce<Aes256Gcm>, CryptoError> {
        let tag = self.siv.tag(plaintext);
        Nonce::<Aes256Gcm>::try_from(&tag[..NONCE_LEN]).map_err(|_| CryptoError::Internal {
            message: "synthetic nonce has the wrong length".into(),
            context: None,
        })
    }

    /// Raw blob form, used where the caller does its own encoding.
    ///
    /// # Errors
    /// [`CryptoError::Encryption`] if AES-GCM fails.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = self.synthetic_nonce(plaintext)?;
        self.sealer.seal_with_nonce(&nonce, FLAG_SYNTHETIC_NONCE, plaintext, DET_AAD)
    }

    /// Opens a blob and re-derives its nonce from the recovered plaintext.
    ///
    /// # Errors
    /// * [`CryptoError::Decryption`] if authentication fails.
    /// * [`CryptoError::InvalidCiphertext`] for malformed blobs or a nonce that does not
    ///   match the plaintext.
    pub fn decrypt_bytes(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let opened = self.sealer.open_parts(blob, DET_AAD)?;
        if opened.flags & FLAG_SYNTHETIC_NONCE == 0 {
            return Err(CryptoError::InvalidCiphertext {
                message: "blob was not produced by the deterministic cipher".into(),
                context: None,
            });
        }
        if !self.siv.verify(&opened.plaintext, opened.nonce) {
            return Err(CryptoError::InvalidCiphertext {
                message: "synthetic nonce mismatch".into(),
                context: None,
            });
        }
        Ok(opened.plaintext)
    }

    /// Encrypts to URL-safe base64, suitable as a store key.
    ///
    /// # Errors
    /// [`CryptoError::Encryption`] if AES-GCM fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(URL_SAFE_NO_PAD.encode(self.encrypt_bytes(plaintext.as_bytes())?))
    }

    /// # Errors
    /// [`CryptoError::Encoding`] for bad base64, otherwise as [`Self::decrypt_bytes`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let blob = URL_SAFE_NO_PAD.decode(ciphertext)?;
        let plaintext = self.decrypt_bytes(&blob)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidCiphertext {
            message: "plaintext is not valid UTF-8".into(),
            context: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(seed: u8) -> DeterministicCipher {
        DeterministicCipher::new(
            &SecretKey::from_bytes([seed; 32]),
            &SecretKey::from_bytes([seed.wrapping_add(1); 32]),
        )
        .unwrap()
    }

    #[test]
    fn test_repeatable() {
        let det = cipher(1);
        assert_eq!(det.encrypt("user:1").unwrap(), det.encrypt("user:1").unwrap());
    }

    #[test]
    fn test_distinct_plaintexts() {
        let det = cipher(1);
        assert_ne!(det.encrypt("user:1").unwrap(), det.encrypt("user:2").unwrap());
    }

    #[test]
    fn test_key_dependent() {
        assert_ne!(cipher(1).encrypt("user:1").unwrap(), cipher(5).encrypt("user:1").unwrap());
    }

    #[test]
    fn test_round_trip_including_empty() {
        let det = cipher(2);
        for text in ["", "hello", "key with spaces", "ключ"] {
            assert_eq!(det.decrypt(&det.encrypt(text).unwrap()).unwrap(), text);
        }
    }

    #[test]
    fn test_ciphertext_does_not_contain_plaintext() {
        let det = cipher(3);
        assert!(!det.encrypt("user:1").unwrap().contains("user"));
    }

    #[test]
    fn test_randomly_sealed_blob_rejected() {
        let det = cipher(4);
        let sealer = SealingKey::new(&SecretKey::from_bytes([4; 32])).unwrap();
        let blob = sealer.seal(b"hello", DET_AAD).unwrap();
        assert!(matches!(det.decrypt_bytes(&blob), Err(CryptoError::InvalidCiphertext { .. })));
    }
}
