//! # Secure Value Envelope
//!
//! Values are written as `|`-delimited composites:
//!
//! ```text
//! TYPE|payload|signature|hash      (tagged form)
//! payload|signature|hash           (untagged form, payload is always RND)
//! ```
//!
//! * `RND` payload: base64 of an AES-256-GCM blob.
//! * `ADD` payload: the decimal Paillier ciphertext.
//! * `signature`: base64 Ed25519 signature over the payload.
//! * `hash`: base64 HMAC-SHA256 over every preceding field joined by `|`.
//!
//! Decoding checks the hash before anything else, then the signature, and only then
//! decrypts. Field order, the delimiter and the tag vocabulary are a storage format:
//! existing data depends on them.

use crate::error::VeilError;
use crate::keys::KeyRing;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use veil_crypto::BigInt;

const DELIMITER: char = '|';
const VALUE_AAD: &[u8] = b"veil.value.v1";
pub(crate) const NON_NUMERIC: &str = "Cannot make arithmetic operations with non number values";

/// Payload kind carried by the tagged form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    /// Randomized AEAD encryption of opaque text.
    Rnd,
    /// Paillier encryption of an integer.
    Add,
}

impl ValueTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rnd => "RND",
            Self::Add => "ADD",
        }
    }
}

impl FromStr for ValueTag {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RND" => Ok(Self::Rnd),
            "ADD" => Ok(Self::Add),
            _ => Err(VeilError::integrity("unknown value tag")),
        }
    }
}

/// Number of fields a secure value is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireForm {
    /// `TYPE|payload|signature|hash`
    Tagged,
    /// `payload|signature|hash`
    Untagged,
}

impl WireForm {
    const fn field_count(self) -> usize {
        match self {
            Self::Tagged => 4,
            Self::Untagged => 3,
        }
    }
}

/// A parsed, not yet verified, secure value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureValue {
    pub tag: ValueTag,
    pub payload: String,
    pub signature: String,
    pub hash: String,
    form: WireForm,
}

impl SecureValue {
    /// Splits `wire` into its fields.
    ///
    /// # Errors
    /// [`VeilError::IntegrityViolation`] for a wrong field count or an unknown tag.
    pub fn parse(wire: &str, form: WireForm) -> Result<Self, VeilError> {
        let fields: Vec<&str> = wire.split(DELIMITER).collect();
        if fields.len() != form.field_count() {
            return Err(VeilError::IntegrityViolation {
                message: "secure value has the wrong number of fields".into(),
                context: Some(format!("expected {}, got {}", form.field_count(), fields.len()).into()),
            });
        }

        let (tag, rest) = match form {
            WireForm::Tagged => (fields[0].parse::<ValueTag>()?, &fields[1..]),
            WireForm::Untagged => (ValueTag::Rnd, &fields[..]),
        };
        Ok(Self {
            tag,
            payload: rest[0].to_owned(),
            signature: rest[1].to_owned(),
            hash: rest[2].to_owned(),
            form,
        })
    }

    /// The fields covered by the integrity hash, joined by `|`.
    fn authenticated_prefix(&self) -> String {
        match self.form {
            WireForm::Tagged => format!("{}|{}|{}", self.tag.as_str(), self.payload, self.signature),
            WireForm::Untagged => format!("{}|{}", self.payload, self.signature),
        }
    }
}

impl fmt::Display for SecureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.authenticated_prefix(), self.hash)
    }
}

/// Encrypts, signs and hashes values, and reverses the process on read.
#[derive(Debug, Clone)]
pub struct ValueCodec {
    keys: Arc<KeyRing>,
    form: WireForm,
    homomorphic: bool,
}

impl ValueCodec {
    /// `homomorphic` turns integer plaintexts into `ADD` values and requires the tagged
    /// form and a Paillier key.
    ///
    /// # Errors
    /// [`VeilError::Configuration`] for an impossible combination.
    pub fn new(keys: Arc<KeyRing>, form: WireForm, homomorphic: bool) -> Result<Self, VeilError> {
        if homomorphic && form != WireForm::Tagged {
            return Err(VeilError::configuration("homomorphic values need the tagged wire form"));
        }
        if homomorphic && keys.paillier().is_none() {
            return Err(VeilError::Configuration {
                message: "homomorphic values need a Paillier key".into(),
                context: Some("keys.homomorphic_key".into()),
            });
        }
        Ok(Self { keys, form, homomorphic })
    }

    #[must_use]
    pub const fn form(&self) -> WireForm {
        self.form
    }

    fn paillier(&self) -> Result<&veil_crypto::PaillierKey, VeilError> {
        self.keys.paillier().ok_or_else(|| VeilError::configuration("no Paillier key loaded"))
    }

    /// Wraps `plaintext`, choosing `ADD` for integers when homomorphic.
    ///
    /// Only canonical decimal integers inside the Paillier domain become `ADD`, so the
    /// value always decodes to the exact input text. Everything else is sealed as `RND`.
    ///
    /// # Errors
    /// [`VeilError::Crypto`] if encryption fails.
    pub fn encode(&self, plaintext: &str) -> Result<String, VeilError> {
        if self.homomorphic {
            let paillier = self.paillier()?;
            if let Some(number) = canonical_integer(plaintext).filter(|n| paillier.in_domain(n)) {
                return self.reseal_add(&paillier.encrypt(&number)?);
            }
        }
        self.encode_opaque(plaintext)
    }

    /// Wraps `plaintext` as `RND` regardless of its content.
    ///
    /// # Errors
    /// [`VeilError::Crypto`] if encryption fails.
    pub fn encode_opaque(&self, plaintext: &str) -> Result<String, VeilError> {
        let blob = self.keys.value().seal(plaintext.as_bytes(), VALUE_AAD)?;
        Ok(self.seal(ValueTag::Rnd, STANDARD.encode(blob)))
    }

    /// Wraps an updated Paillier ciphertext in a fresh `ADD` envelope.
    ///
    /// The ciphertext is signed and hashed again but not re-randomized.
    ///
    /// # Errors
    /// [`VeilError::Configuration`] in the untagged form, which cannot carry `ADD`.
    pub fn reseal_add(&self, ciphertext: &BigInt) -> Result<String, VeilError> {
        if self.form != WireForm::Tagged {
            return Err(VeilError::configuration("ADD values need the tagged wire form"));
        }
        Ok(self.seal(ValueTag::Add, ciphertext.to_string()))
    }

    fn seal(&self, tag: ValueTag, payload: String) -> String {
        let signature = STANDARD.encode(self.keys.signer().sign(payload.as_bytes()));
        let mut value =
            SecureValue { tag, payload, signature, hash: String::new(), form: self.form };
        value.hash = STANDARD.encode(self.keys.integrity().tag(value.authenticated_prefix().as_bytes()));
        value.to_string()
    }

    /// Parses and verifies `wire` without decrypting it.
    ///
    /// # Errors
    /// * [`VeilError::IntegrityViolation`] for malformed input or a hash mismatch.
    /// * [`VeilError::AuthenticityViolation`] if the signature does not verify.
    pub fn verify(&self, wire: &str) -> Result<SecureValue, VeilError> {
        let value = SecureValue::parse(wire, self.form)?;

        let hash = STANDARD
            .decode(&value.hash)
            .map_err(|_| VeilError::integrity("integrity hash is not base64"))?;
        if !self.keys.integrity().verify(value.authenticated_prefix().as_bytes(), &hash) {
            return Err(VeilError::integrity("Integrity Validation Failed... Data was tampered."));
        }

        let authentic = STANDARD.decode(&value.signature).is_ok_and(|signature| {
            self.keys.signer().verify(value.payload.as_bytes(), &signature).is_ok()
        });
        if !authentic {
            return Err(VeilError::AuthenticityViolation {
                message: "Error verifying authenticity...".into(),
                context: None,
            });
        }
        Ok(value)
    }

    /// Verifies and decrypts `wire`.
    ///
    /// # Errors
    /// As [`Self::verify`]; a payload that fails to decrypt after verification is also an
    /// [`VeilError::IntegrityViolation`].
    pub fn decode(&self, wire: &str) -> Result<String, VeilError> {
        let value = self.verify(wire)?;
        match value.tag {
            ValueTag::Rnd => {
                let blob = STANDARD
                    .decode(&value.payload)
                    .map_err(|_| VeilError::integrity("RND payload is not base64"))?;
                let plaintext = self
                    .keys
                    .value()
                    .open(&blob, VALUE_AAD)
                    .map_err(|_| VeilError::integrity("RND payload failed to decrypt"))?;
                String::from_utf8(plaintext)
                    .map_err(|_| VeilError::integrity("RND payload is not UTF-8"))
            },
            ValueTag::Add => {
                let ciphertext = parse_add_payload(&value.payload)?;
                let number = self
                    .paillier()?
                    .decrypt(&ciphertext)
                    .map_err(|_| VeilError::integrity("ADD payload failed to decrypt"))?;
                Ok(number.to_string())
            },
        }
    }

    /// Verifies `wire` and returns its Paillier ciphertext for homomorphic updates.
    ///
    /// # Errors
    /// * [`VeilError::InvalidInput`] if the value is not `ADD`.
    /// * As [`Self::verify`] otherwise.
    pub fn open_add(&self, wire: &str) -> Result<BigInt, VeilError> {
        let value = self.verify(wire)?;
        if value.tag != ValueTag::Add {
            return Err(VeilError::invalid_input(NON_NUMERIC));
        }
        parse_add_payload(&value.payload)
    }
}

/// `text` as an integer when it is written exactly as the integer prints: an optional
/// `-`, ASCII digits, no leading zeros, no `+` and no separators.
fn canonical_integer(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<BigInt>().ok().filter(|n| n.to_string() == text)
}

fn parse_add_payload(payload: &str) -> Result<BigInt, VeilError> {
    payload.parse::<BigInt>().map_err(|_| VeilError::integrity("ADD payload is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;
    use veil_crypto::PaillierKey;

    static PAILLIER: LazyLock<PaillierKey> =
        LazyLock::new(|| PaillierKey::generate(512).expect("key generation"));

    fn keys() -> Arc<KeyRing> {
        KeyRing::builder().paillier(PAILLIER.clone()).secret("master", "salt").build().unwrap()
    }

    fn tagged() -> ValueCodec {
        ValueCodec::new(keys(), WireForm::Tagged, true).unwrap()
    }

    fn untagged() -> ValueCodec {
        ValueCodec::new(keys(), WireForm::Untagged, false).unwrap()
    }

    #[test]
    fn test_rnd_round_trip() {
        let codec = tagged();
        let wire = codec.encode("hello world").unwrap();
        assert!(wire.starts_with("RND|"));
        assert_eq!(wire.split('|').count(), 4);
        assert_eq!(codec.decode(&wire).unwrap(), "hello world");
    }

    #[test]
    fn test_add_round_trip() {
        let codec = tagged();
        let wire = codec.encode("-42").unwrap();
        assert!(wire.starts_with("ADD|"));
        assert!(!wire.contains("42|"));
        assert_eq!(codec.decode(&wire).unwrap(), "-42");
    }

    #[test]
    fn test_untagged_form() {
        let codec = untagged();
        let wire = codec.encode("42").unwrap();
        assert_eq!(wire.split('|').count(), 3);
        assert_eq!(codec.decode(&wire).unwrap(), "42");
    }

    #[test]
    fn test_randomized_encoding() {
        let codec = tagged();
        assert_ne!(codec.encode("same").unwrap(), codec.encode("same").unwrap());
        assert_ne!(codec.encode("7").unwrap(), codec.encode("7").unwrap());
    }

    #[test]
    fn test_hash_tamper_detected() {
        let codec = tagged();
        let wire = codec.encode("secret").unwrap();
        let mut tampered = wire.into_bytes();
        let last = tampered.len() - 5;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let err = codec.decode(&String::from_utf8(tampered).unwrap()).unwrap_err();
        assert!(matches!(err, VeilError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_every_payload_byte_is_protected() {
        let codec = tagged();
        let wire = codec.encode("protected").unwrap();
        let start = wire.find('|').unwrap() + 1;
        let end = start + wire[start..].find('|').unwrap();
        for i in start..end {
            let mut bytes = wire.clone().into_bytes();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            let err = codec.decode(&String::from_utf8(bytes).unwrap()).unwrap_err();
            assert!(err.is_security_violation(), "byte {i} accepted");
        }
    }

    #[test]
    fn test_forged_hash_fails_signature() {
        // An attacker holding the integrity key but not the signing key.
        let codec = tagged();
        let wire = codec.encode("original").unwrap();
        let mut value = SecureValue::parse(&wire, WireForm::Tagged).unwrap();
        value.payload = STANDARD.encode(b"forged payload bytes that are long enough");
        value.hash = STANDARD
            .encode(codec.keys.integrity().tag(value.authenticated_prefix().as_bytes()));
        let err = codec.decode(&value.to_string()).unwrap_err();
        assert!(matches!(err, VeilError::AuthenticityViolation { .. }));
    }

    #[test]
    fn test_wrong_field_count_and_tag() {
        let codec = tagged();
        assert!(matches!(codec.decode("a|b"), Err(VeilError::IntegrityViolation { .. })));
        assert!(matches!(codec.decode("XOR|a|b|c"), Err(VeilError::IntegrityViolation { .. })));
        assert!(matches!(codec.decode("plain text"), Err(VeilError::IntegrityViolation { .. })));
    }

    #[test]
    fn test_other_keys_rejected() {
        let wire = tagged().encode("hello").unwrap();
        let other = KeyRing::builder()
            .paillier(PAILLIER.clone())
            .secret("another master", "salt")
            .build()
            .unwrap();
        let codec = ValueCodec::new(other, WireForm::Tagged, true).unwrap();
        assert!(codec.decode(&wire).unwrap_err().is_security_violation());
    }

    #[test]
    fn test_open_add_requires_add_tag() {
        let codec = tagged();
        let rnd = codec.encode("text").unwrap();
        let err = codec.open_add(&rnd).unwrap_err();
        assert!(matches!(err, VeilError::InvalidInput { .. }));
        assert_eq!(err.to_string(), format!("Invalid input: {NON_NUMERIC}"));

        let add = codec.encode("5").unwrap();
        let c = codec.open_add(&add).unwrap();
        assert_eq!(codec.decode(&codec.reseal_add(&c).unwrap()).unwrap(), "5");
    }

    #[test]
    fn test_homomorphic_needs_key_and_tagged_form() {
        let no_paillier = KeyRing::builder().secret("master", "salt").build().unwrap();
        assert!(ValueCodec::new(no_paillier, WireForm::Tagged, true).is_err());
        assert!(ValueCodec::new(keys(), WireForm::Untagged, true).is_err());
    }
}
