//! Property-preserving encryption primitives.
//!
//! Each cipher trades a specific, documented leakage for a server-side capability:
//!
//! | Module | Capability | Leaks |
//! |---|---|---|
//! | [`det`] | equality lookups on keys | equality of plaintexts |
//! | [`ope`] | range queries on integer scores | order and rough magnitude |
//! | [`paillier`] | addition and scalar multiplication on ciphertexts | nothing beyond size |
//! | [`search`] | word membership tests on text | recurrence of equal words |
//!
//! [`aead`] provides the randomized AES-256-GCM sealing used for ordinary values,
//! [`mac`] the HMAC-SHA256 integrity and PRF primitive, and [`sign`] Ed25519 signatures.
//! Keys are 32-byte [`SecretKey`]s, normally expanded from one master secret with
//! [`KeyDeriver`].
//!
//! ```
//! use veil_crypto::{DeterministicCipher, KeyDeriver};
//!
//! let deriver = KeyDeriver::new("master", "salt");
//! let det = DeterministicCipher::new(
//!     &deriver.derive("v1_det:").unwrap(),
//!     &deriver.derive("v1_det_mac:").unwrap(),
//! )
//! .unwrap();
//! assert_eq!(det.encrypt("user:1").unwrap(), det.encrypt("user:1").unwrap());
//! ```

pub mod aead;
pub mod det;
mod error;
pub mod mac;
pub mod ope;
pub mod paillier;
pub mod search;
pub mod secret;
pub mod sign;

pub use crate::aead::SealingKey;
pub use crate::det::DeterministicCipher;
pub use crate::error::{CryptoError, CryptoErrorExt};
pub use crate::mac::MacKey;
pub use crate::ope::OrderPreservingCipher;
pub use crate::paillier::PaillierKey;
pub use crate::search::SearchableCipher;
pub use crate::secret::{KeyDeriver, SecretKey};
pub use crate::sign::Signer;

pub use num_bigint::BigInt;
