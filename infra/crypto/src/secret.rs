use crate::error::CryptoError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of every symmetric key in the crate.
pub const KEY_LEN: usize = 32;

/// 256-bit secret, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Draws a fresh key from the OS random source.
    ///
    /// # Errors
    /// [`CryptoError::Entropy`] if the random source is unavailable.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Parses a standard base64 encoded 32-byte key.
    ///
    /// # Errors
    /// [`CryptoError::Encoding`] for bad base64, [`CryptoError::InvalidKey`] for a wrong length.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = STANDARD.decode(encoded.trim())?;
        let result = <[u8; KEY_LEN]>::try_from(decoded.as_slice()).map(Self).map_err(|_| {
            CryptoError::InvalidKey {
                message: format!("expected {KEY_LEN} bytes, got {}", decoded.len()).into(),
                context: None,
            }
        });
        decoded.zeroize();
        result
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    #[must_use]
    pub const fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// HKDF-SHA256 expander over one master secret.
///
/// Each key is expanded under a distinct `info` label so subkeys are independent.
pub struct KeyDeriver {
    hk: Hkdf<Sha256>,
}

impl KeyDeriver {
    #[must_use]
    pub fn new(ikm: impl AsRef<[u8]>, salt: impl AsRef<[u8]>) -> Self {
        let (_, hk) = Hkdf::<Sha256>::extract(Some(salt.as_ref()), ikm.as_ref());
        Self { hk }
    }

    /// Expands the subkey bound to `label`.
    ///
    /// # Errors
    /// [`CryptoError::Internal`] if HKDF refuses the output length.
    pub fn derive(&self, label: &str) -> Result<SecretKey, CryptoError> {
        let mut okm = [0u8; KEY_LEN];
        self.hk.expand(label.as_bytes(), &mut okm).map_err(|_| CryptoError::Internal {
            message: "HKDF expansion failed".into(),
            context: Some(label.to_owned().into()),
        })?;
        Ok(SecretKey(okm))
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_give_independent_keys() {
        let deriver = KeyDeriver::new("master", "salt");
        let a = deriver.derive("v1_det:").unwrap();
        let b = deriver.derive("v1_ope:").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, deriver.derive("v1_det:").unwrap());
    }

    #[test]
    fn test_salt_changes_output() {
        let a = KeyDeriver::new("master", "salt-a").derive("x").unwrap();
        let b = KeyDeriver::new("master", "salt-b").derive("x").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_base64_round_trip() {
        let key = SecretKey::random().unwrap();
        assert_eq!(SecretKey::from_base64(&key.to_base64()).unwrap(), key);
    }

    #[test]
    fn test_base64_rejects_short_keys() {
        let err = SecretKey::from_base64("c2hvcnQ=").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::from_bytes([7; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SecretKey(..)");
    }
}
