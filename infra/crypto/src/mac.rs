use crate::error::CryptoError;
use crate::secret::SecretKey;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output length.
pub const MAC_LEN: usize = 32;

/// Keyed HMAC-SHA256, used both as a MAC and as a PRF.
#[derive(Clone)]
pub struct MacKey {
    keyed: HmacSha256,
}

impl MacKey {
    /// # Errors
    /// [`CryptoError::InvalidKey`] if HMAC rejects the key.
    pub fn new(key: &SecretKey) -> Result<Self, CryptoError> {
        let keyed = <HmacSha256 as hmac::digest::KeyInit>::new_from_slice(key.expose())
            .map_err(|_| CryptoError::InvalidKey {
                message: "HMAC key rejected".into(),
                context: None,
            })?;
        Ok(Self { keyed })
    }

    #[must_use]
    pub fn tag(&self, data: &[u8]) -> [u8; MAC_LEN] {
        let mut mac = self.keyed.clone();
        mac.update(data);
        let digest = mac.finalize().into_bytes();
        let mut out = [0u8; MAC_LEN];
        out.copy_from_slice(&digest);
        out
    }

    /// Constant-time check of `tag` against the MAC of `data`.
    ///
    /// Truncated tags are accepted when they match the MAC prefix.
    #[must_use]
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let mut mac = self.keyed.clone();
        mac.update(data);
        if tag.len() == MAC_LEN {
            mac.verify_slice(tag).is_ok()
        } else if !tag.is_empty() && tag.len() < MAC_LEN {
            mac.verify_truncated_left(tag).is_ok()
        } else {
            false
        }
    }

    /// First 8 bytes of the MAC as a big-endian integer.
    #[must_use]
    pub fn prf_u64(&self, data: &[u8]) -> u64 {
        let tag = self.tag(data);
        let mut head = [0u8; 8];
        head.copy_from_slice(&tag[..8]);
        u64::from_be_bytes(head)
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MacKey(HMAC-SHA256)")
    }
}
