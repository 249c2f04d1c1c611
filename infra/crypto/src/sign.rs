use crate::error::CryptoError;
use crate::secret::SecretKey;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use std::fmt;

/// Ed25519 signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 keypair derived from a 32-byte seed.
#[derive(Clone)]
pub struct Signer {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl Signer {
    #[must_use]
    pub fn from_seed(seed: &SecretKey) -> Self {
        let signing = SigningKey::from_bytes(seed.expose());
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    #[must_use]
    pub fn sign(&self, data: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(data).to_bytes()
    }

    /// # Errors
    /// [`CryptoError::Signature`] for a malformed signature or one that does not match `data`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let signature = Signature::from_slice(signature)?;
        self.verifying.verify(data, &signature)?;
        Ok(())
    }

    #[must_use]
    pub const fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("verifying", &self.verifying).finish_non_exhaustive()
    }
}
