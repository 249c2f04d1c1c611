//! Paillier additively homomorphic encryption.
//!
//! Ciphertexts live in `Z*_{n^2}`; multiplying two ciphertexts adds their plaintexts,
//! and raising one to `k` multiplies its plaintext by `k`. Signed plaintexts are encoded
//! modulo `n`: residues above `n / 2` decrypt as negatives.
//!
//! ```
//! use num_bigint::BigInt;
//! use veil_crypto::paillier::{self, PaillierKey};
//!
//! let key = PaillierKey::generate(512).unwrap();
//! let a = key.encrypt(&BigInt::from(42)).unwrap();
//! let b = key.encrypt(&BigInt::from(8)).unwrap();
//! let sum = paillier::add(&a, &b, key.nsquare());
//! assert_eq!(key.decrypt(&sum).unwrap(), BigInt::from(50));
//! ```

use crate::error::{CryptoError, CryptoErrorExt};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modulus size used by key generation tooling.
pub const DEFAULT_MODULUS_BITS: u64 = 2048;
/// Smallest modulus [`PaillierKey::generate`] accepts.
pub const MIN_MODULUS_BITS: u64 = 256;

const MILLER_RABIN_ROUNDS: usize = 40;
const SMALL_PRIMES: [u32; 24] =
    [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97];

/// A Paillier keypair: public `(n, g)` with private `(p, q, lambda, mu)`.
#[derive(Clone, PartialEq, Eq)]
pub struct PaillierKey {
    p: BigInt,
    q: BigInt,
    n: BigInt,
    nsquare: BigInt,
    g: BigInt,
    lambda: BigInt,
    mu: BigInt,
}

/// Wire record for [`PaillierKey::to_key_string`].
#[derive(Serialize, Deserialize)]
struct KeyRecord {
    g: Vec<u8>,
    lambda: Vec<u8>,
    mu: Vec<u8>,
    n: Vec<u8>,
    nsquare: Vec<u8>,
    p: Vec<u8>,
    q: Vec<u8>,
}

impl PaillierKey {
    /// Generates a keypair whose modulus has exactly `modulus_bits` bits.
    ///
    /// # Errors
    /// * [`CryptoError::InvalidKey`] if `modulus_bits` is odd or below [`MIN_MODULUS_BITS`].
    /// * [`CryptoError::Entropy`] if the random source fails.
    pub fn generate(modulus_bits: u64) -> Result<Self, CryptoError> {
        if modulus_bits < MIN_MODULUS_BITS || modulus_bits % 2 != 0 {
            return Err(CryptoError::InvalidKey {
                message: format!(
                    "modulus must be an even bit length of at least {MIN_MODULUS_BITS}"
                )
                .into(),
                context: Some(format!("bits={modulus_bits}").into()),
            });
        }

        loop {
            let p = random_prime(modulus_bits / 2)?;
            let q = random_prime(modulus_bits / 2)?;
            if p == q {
                continue;
            }
            if let Some(key) = Self::from_primes(BigInt::from(p), BigInt::from(q)) {
                return Ok(key);
            }
        }
    }

    /// Derives the full keypair with `g = n + 1`. `None` when `p, q` are unusable.
    fn from_primes(p: BigInt, q: BigInt) -> Option<Self> {
        let n = &p * &q;
        let nsquare = &n * &n;
        let g = &n + BigInt::one();

        let p1 = &p - BigInt::one();
        let q1 = &q - BigInt::one();
        if !n.gcd(&(&p1 * &q1)).is_one() {
            return None;
        }

        let lambda = p1.lcm(&q1);
        let u = g.modpow(&lambda, &nsquare);
        let mu = l_function(&u, &n).modinv(&n)?;

        Some(Self { p, q, n, nsquare, g, lambda, mu })
    }

    #[must_use]
    pub const fn n(&self) -> &BigInt {
        &self.n
    }

    #[must_use]
    pub const fn nsquare(&self) -> &BigInt {
        &self.nsquare
    }

    #[must_use]
    pub const fn g(&self) -> &BigInt {
        &self.g
    }

    #[must_use]
    pub const fn lambda(&self) -> &BigInt {
        &self.lambda
    }

    #[must_use]
    pub const fn mu(&self) -> &BigInt {
        &self.mu
    }

    #[must_use]
    pub const fn p(&self) -> &BigInt {
        &self.p
    }

    #[must_use]
    pub const fn q(&self) -> &BigInt {
        &self.q
    }

    /// Size of the modulus in bits.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.n.bits()
    }

    /// `true` when `|m| <= n / 2`, the signed range that decrypts unambiguously.
    #[must_use]
    pub fn in_domain(&self, m: &BigInt) -> bool {
        m.abs() <= &self.n >> 1
    }

    /// Maps a signed plaintext into `[0, n)`.
    fn encode_plaintext(&self, m: &BigInt) -> Result<BigInt, CryptoError> {
        if !self.in_domain(m) {
            return Err(CryptoError::OutOfDomain {
                message: "plaintext magnitude exceeds n / 2".into(),
                context: None,
            });
        }
        Ok(m.mod_floor(&self.n))
    }

    /// `c = g^m * r^n mod n^2` with a fresh `r` coprime to `n`.
    ///
    /// # Errors
    /// * [`CryptoError::OutOfDomain`] when `|m| > n / 2`.
    /// * [`CryptoError::Entropy`] if the random source fails.
    pub fn encrypt(&self, m: &BigInt) -> Result<BigInt, CryptoError> {
        let m = self.encode_plaintext(m)?;
        let r = self.random_unit()?;
        let gm = self.g.modpow(&m, &self.nsquare);
        let rn = r.modpow(&self.n, &self.nsquare);
        Ok((gm * rn).mod_floor(&self.nsquare))
    }

    /// `m = L(c^lambda mod n^2) * mu mod n`, mapped back to a signed value.
    ///
    /// # Errors
    /// [`CryptoError::InvalidCiphertext`] if `c` is outside `(0, n^2)` or shares a factor with `n`.
    pub fn decrypt(&self, c: &BigInt) -> Result<BigInt, CryptoError> {
        self.check_ciphertext(c)?;
        let u = c.modpow(&self.lambda, &self.nsquare);
        let m = (l_function(&u, &self.n) * &self.mu).mod_floor(&self.n);
        let half = &self.n >> 1;
        Ok(if m > half { m - &self.n } else { m })
    }

    fn check_ciphertext(&self, c: &BigInt) -> Result<(), CryptoError> {
        if !c.is_positive() || c >= &self.nsquare || !c.gcd(&self.n).is_one() {
            return Err(CryptoError::InvalidCiphertext {
                message: "value is not a ciphertext under this Paillier key".into(),
                context: None,
            });
        }
        Ok(())
    }

    fn random_unit(&self) -> Result<BigInt, CryptoError> {
        loop {
            let r = random_below(&self.n)?;
            if !r.is_zero() && r.gcd(&self.n).is_one() {
                return Ok(r);
            }
        }
    }

    /// Serializes every key field (`g, lambda, mu, n, nsquare, p, q`) to base64.
    ///
    /// # Errors
    /// [`CryptoError::Serialization`] if encoding fails.
    pub fn to_key_string(&self) -> Result<String, CryptoError> {
        let record = KeyRecord {
            g: self.g.to_signed_bytes_be(),
            lambda: self.lambda.to_signed_bytes_be(),
            mu: self.mu.to_signed_bytes_be(),
            n: self.n.to_signed_bytes_be(),
            nsquare: self.nsquare.to_signed_bytes_be(),
            p: self.p.to_signed_bytes_be(),
            q: self.q.to_signed_bytes_be(),
        };
        let bytes = postcard::to_stdvec(&record).context("Encoding Paillier key")?;
        Ok(STANDARD.encode(bytes))
    }

    /// Parses a key produced by [`Self::to_key_string`] and checks its consistency.
    ///
    /// # Errors
    /// * [`CryptoError::Encoding`] / [`CryptoError::Serialization`] for malformed input.
    /// * [`CryptoError::InvalidKey`] if the fields do not describe one keypair.
    pub fn from_key_string(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(encoded.trim()).context("Decoding Paillier key")?;
        let record: KeyRecord =
            postcard::from_bytes(&bytes).context("Decoding Paillier key record")?;

        let key = Self {
            g: BigInt::from_signed_bytes_be(&record.g),
            lambda: BigInt::from_signed_bytes_be(&record.lambda),
            mu: BigInt::from_signed_bytes_be(&record.mu),
            n: BigInt::from_signed_bytes_be(&record.n),
            nsquare: BigInt::from_signed_bytes_be(&record.nsquare),
            p: BigInt::from_signed_bytes_be(&record.p),
            q: BigInt::from_signed_bytes_be(&record.q),
        };

        let consistent = key.n.is_positive()
            && key.n == &key.p * &key.q
            && key.nsquare == &key.n * &key.n
            && (&key.mu * l_function(&key.g.modpow(&key.lambda, &key.nsquare), &key.n))
                .mod_floor(&key.n)
                .is_one();
        if !consistent {
            return Err(CryptoError::InvalidKey {
                message: "Paillier key fields are inconsistent".into(),
                context: None,
            });
        }
        Ok(key)
    }
}

impl fmt::Debug for PaillierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaillierKey").field("bits", &self.bits()).finish_non_exhaustive()
    }
}

/// Ciphertext of `m1 + m2`.
#[must_use]
pub fn add(c1: &BigInt, c2: &BigInt, nsquare: &BigInt) -> BigInt {
    (c1 * c2).mod_floor(nsquare)
}

/// Ciphertext of `m1 - m2`, computed as `c1 * c2^-1 mod n^2`.
///
/// # Errors
/// [`CryptoError::InvalidCiphertext`] if `c2` has no inverse modulo `n^2`.
pub fn subtract(c1: &BigInt, c2: &BigInt, nsquare: &BigInt) -> Result<BigInt, CryptoError> {
    let inverse = invert(c2, nsquare)?;
    Ok((c1 * inverse).mod_floor(nsquare))
}

/// Ciphertext of `m * k`, computed as `c^k mod n^2` (inverse first for negative `k`).
///
/// # Errors
/// [`CryptoError::InvalidCiphertext`] if `k < 0` and `c` has no inverse.
pub fn scalar_multiply(c: &BigInt, k: i64, nsquare: &BigInt) -> Result<BigInt, CryptoError> {
    let exponent = BigInt::from(k.unsigned_abs());
    let base = if k < 0 { invert(c, nsquare)? } else { c.mod_floor(nsquare) };
    Ok(base.modpow(&exponent, nsquare))
}

fn invert(c: &BigInt, nsquare: &BigInt) -> Result<BigInt, CryptoError> {
    c.modinv(nsquare).ok_or_else(|| CryptoError::InvalidCiphertext {
        message: "ciphertext is not invertible modulo n^2".into(),
        context: None,
    })
}

/// `L(u) = (u - 1) / n`
fn l_function(u: &BigInt, n: &BigInt) -> BigInt {
    (u - BigInt::one()) / n
}

fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes)?;
    Ok(bytes)
}

/// Uniform-ish value in `[0, bound)`; the bias from 64 extra bits is negligible.
fn random_below(bound: &BigInt) -> Result<BigInt, CryptoError> {
    let len = usize::try_from(bound.bits().div_ceil(8)).map_err(|_| "bound too large")? + 8;
    let value = BigInt::from_bytes_be(Sign::Plus, &random_bytes(len)?);
    Ok(value.mod_floor(bound))
}

/// Random prime with exactly `bits` bits and the top two bits set.
fn random_prime(bits: u64) -> Result<BigUint, CryptoError> {
    let len = usize::try_from(bits.div_ceil(8)).map_err(|_| "prime size too large")?;
    loop {
        let mut candidate = BigUint::from_bytes_be(&random_bytes(len)?);
        let excess = u64::try_from(len).map_err(|_| "prime size too large")? * 8 - bits;
        candidate >>= excess;
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(bits - 2, true);
        candidate.set_bit(0, true);

        if is_probable_prime(&candidate)? {
            return Ok(candidate);
        }
    }
}

fn is_probable_prime(n: &BigUint) -> Result<bool, CryptoError> {
    let two = BigUint::from(2u32);
    if n < &two {
        return Ok(false);
    }
    for small in SMALL_PRIMES.iter().copied().chain(std::iter::once(2)) {
        let small = BigUint::from(small);
        if n == &small {
            return Ok(true);
        }
        if (n % &small).is_zero() {
            return Ok(false);
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let witness_range = BigInt::from(n - BigUint::from(3u32));

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = random_below(&witness_range)?.to_biguint().unwrap_or_default() + &two;
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return Ok(false);
    }
    Ok(true)
}
