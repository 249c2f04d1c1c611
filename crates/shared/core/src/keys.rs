use crate::error::{VeilError, VeilErrorExt};
use private::Sealed;
use std::fmt;
use std::sync::Arc;
use veil_crypto::{
    DeterministicCipher, KeyDeriver, MacKey, OrderPreservingCipher, PaillierKey, SealingKey,
    SearchableCipher, Signer,
};

const LABEL_DET: &str = "v1_det:";
const LABEL_DET_MAC: &str = "v1_det_mac:";
const LABEL_OPE: &str = "v1_ope:";
const LABEL_SEARCH: &str = "v1_search:";
const LABEL_VALUE: &str = "v1_value:";
const LABEL_INTEGRITY: &str = "v1_integrity:";
const LABEL_SIGNING: &str = "v1_signing:";

/// All key material the dispatcher needs, built once at startup.
///
/// Symmetric keys and the Ed25519 seed are HKDF subkeys of one master secret. The
/// Paillier key is supplied separately because it cannot be derived.
pub struct KeyRing {
    det: DeterministicCipher,
    ope: OrderPreservingCipher,
    search: SearchableCipher,
    value: SealingKey,
    integrity: MacKey,
    signer: Signer,
    paillier: Option<PaillierKey>,
}

impl KeyRing {
    pub fn builder() -> KeyRingBuilder {
        KeyRingBuilder::default()
    }

    pub const fn det(&self) -> &DeterministicCipher {
        &self.det
    }

    pub const fn ope(&self) -> &OrderPreservingCipher {
        &self.ope
    }

    pub const fn search(&self) -> &SearchableCipher {
        &self.search
    }

    pub const fn value(&self) -> &SealingKey {
        &self.value
    }

    pub const fn integrity(&self) -> &MacKey {
        &self.integrity
    }

    pub const fn signer(&self) -> &Signer {
        &self.signer
    }

    pub const fn paillier(&self) -> Option<&PaillierKey> {
        self.paillier.as_ref()
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("paillier", &self.paillier)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct NoSecret;
pub struct WithSecret {
    master: String,
    salt: String,
}

impl fmt::Debug for WithSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WithSecret(..)")
    }
}

mod private {
    pub trait Sealed {}
}
impl Sealed for NoSecret {}
impl Sealed for WithSecret {}

/// Builder for [`KeyRing`]. The master secret must be set before building.
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct KeyRingBuilder<S: Sealed = NoSecret> {
    secret: S,
    paillier: Option<PaillierKey>,
}

impl<S: Sealed> KeyRingBuilder<S> {
    pub fn paillier(mut self, key: PaillierKey) -> Self {
        self.paillier = Some(key);
        self
    }

    /// Parses a serialized Paillier key.
    ///
    /// # Errors
    /// [`VeilError::Configuration`] if the string is not a valid key.
    pub fn paillier_str(self, encoded: &str) -> Result<Self, VeilError> {
        let key = PaillierKey::from_key_string(encoded).map_err(|err| VeilError::Configuration {
            message: err.to_string().into(),
            context: Some("homomorphic_key".into()),
        })?;
        Ok(self.paillier(key))
    }
}

impl KeyRingBuilder<NoSecret> {
    pub fn secret(
        self,
        master: impl Into<String>,
        salt: impl Into<String>,
    ) -> KeyRingBuilder<WithSecret> {
        KeyRingBuilder {
            secret: WithSecret { master: master.into(), salt: salt.into() },
            paillier: self.paillier,
        }
    }
}

impl KeyRingBuilder<WithSecret> {
    /// Derives every subkey and assembles the ring.
    ///
    /// # Errors
    /// * [`VeilError::Configuration`] if the master secret or salt is empty.
    /// * [`VeilError::Crypto`] if a cipher rejects its key.
    pub fn build(self) -> Result<Arc<KeyRing>, VeilError> {
        let WithSecret { master, salt } = &self.secret;
        if master.is_empty() {
            return Err(VeilError::configuration("master secret is empty"));
        }
        if salt.is_empty() {
            return Err(VeilError::configuration("salt is empty"));
        }

        let deriver = KeyDeriver::new(master, salt);
        let derive = |label: &'static str| deriver.derive(label).context(label);

        Ok(Arc::new(KeyRing {
            det: DeterministicCipher::new(&derive(LABEL_DET)?, &derive(LABEL_DET_MAC)?)?,
            ope: OrderPreservingCipher::new(&derive(LABEL_OPE)?)?,
            search: SearchableCipher::new(&derive(LABEL_SEARCH)?)?,
            value: SealingKey::new(&derive(LABEL_VALUE)?)?,
            integrity: MacKey::new(&derive(LABEL_INTEGRITY)?)?,
            signer: Signer::from_seed(&derive(LABEL_SIGNING)?),
            paillier: self.paillier,
        }))
    }
}
