//! Order-preserving encryption for integer scores.
//!
//! `enc(x) = a*x + b + (PRF(x) mod a)` with a key-derived slope `a` and offset `b`.
//! Every plaintext owns the disjoint interval `[a*x + b, a*x + b + a)`, so the mapping is
//! strictly increasing and inverts by floor division. The PRF jitter hides the exact
//! affine relation, but ciphertext order always equals plaintext order and the rough
//! magnitude of a plaintext is visible. That leakage is what makes server-side range
//! queries possible.
//!
//! Ciphertexts stay below `2^53` in magnitude, so they survive a round trip through a
//! Redis sorted-set score (an IEEE double) without loss.

use crate::error::CryptoError;
use crate::mac::MacKey;
use crate::secret::SecretKey;

/// Smallest plaintext accepted.
pub const MIN_PLAINTEXT: i64 = i32::MIN as i64;
/// Largest plaintext accepted.
pub const MAX_PLAINTEXT: i64 = i32::MAX as i64;

const SLOPE_MIN: u64 = 1 << 12;
const SLOPE_MAX: u64 = 1 << 21;
const OFFSET_BOUND: u64 = 1 << 40;

const PARAMS_LABEL: &[u8] = b"veil.ope.params";
const POINT_LABEL: &[u8] = b"veil.ope.x";

#[derive(Debug)]
pub struct OrderPreservingCipher {
    prf: MacKey,
    slope: i64,
    offset: i64,
}

impl OrderPreservingCipher {
    /// # Errors
    /// [`CryptoError::InvalidKey`] for unusable key material.
    pub fn new(key: &SecretKey) -> Result<Self, CryptoError> {
        let prf = MacKey::new(key)?;
        let params = prf.tag(PARAMS_LABEL);

        let mut word = [0u8; 8];
        word.copy_from_slice(&params[..8]);
        let slope = SLOPE_MIN + u64::from_be_bytes(word) % (SLOPE_MAX - SLOPE_MIN);
        word.copy_from_slice(&params[8..16]);
        let offset = u64::from_be_bytes(word) % (2 * OFFSET_BOUND + 1);

        let slope = i64::try_from(slope).map_err(|_| "OPE slope out of range")?;
        let offset = i64::try_from(offset).map_err(|_| "OPE offset out of range")?
            - i64::try_from(OFFSET_BOUND).map_err(|_| "OPE offset out of range")?;

        Ok(Self { prf, slope, offset })
    }

    fn jitter(&self, x: i64) -> i64 {
        let mut input = Vec::with_capacity(POINT_LABEL.len() + 8);
        input.extend_from_slice(POINT_LABEL);
        input.extend_from_slice(&x.to_be_bytes());
        // slope < 2^21, so the remainder always fits.
        (self.prf.prf_u64(&input) % self.slope.unsigned_abs()).cast_signed()
    }

    fn check_domain(x: i64) -> Result<(), CryptoError> {
        if x < MIN_PLAINTEXT || x > MAX_PLAINTEXT {
            return Err(CryptoError::OutOfDomain {
                message: "OPE plaintext must fit in a 32-bit signed integer".into(),
                context: None,
            });
        }
        Ok(())
    }

    /// # Errors
    /// [`CryptoError::OutOfDomain`] outside `[MIN_PLAINTEXT, MAX_PLAINTEXT]`.
    pub fn encrypt(&self, x: i64) -> Result<i64, CryptoError> {
        Self::check_domain(x)?;
        Ok(self.slope * x + self.offset + self.jitter(x))
    }

    /// # Errors
    /// [`CryptoError::InvalidCiphertext`] if `c` is not the image of any plaintext.
    pub fn decrypt(&self, c: i64) -> Result<i64, CryptoError> {
        let invalid = || CryptoError::InvalidCiphertext {
            message: "not an OPE ciphertext for this key".into(),
            context: Some(c.to_string().into()),
        };

        let x = c.checked_sub(self.offset).ok_or_else(invalid)?.div_euclid(self.slope);
        if Self::check_domain(x).is_err() || self.encrypt(x)? != c {
            return Err(invalid());
        }
        Ok(x)
    }
}
