//! Word-level searchable encryption.
//!
//! Text is split on single spaces. Each word becomes one token:
//!
//! ```text
//! base64url( HMAC(search_key, word)[..8] || det_blob(word) )
//! ```
//!
//! The leading digest lets a holder of the search key test for a word without opening
//! anything; the deterministic body makes the token reversible. Equal words produce equal
//! tokens, so word recurrence is visible.

use crate::det::DeterministicCipher;
use crate::error::CryptoError;
use crate::mac::MacKey;
use crate::secret::{KeyDeriver, SecretKey};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Truncated digest length carried at the front of every token.
pub const DIGEST_LEN: usize = 8;

const WORD_SEPARATOR: char = ' ';

#[derive(Debug)]
pub struct SearchableCipher {
    digest: MacKey,
    words: DeterministicCipher,
}

impl SearchableCipher {
    /// Expands `key` into a digest key and a deterministic word cipher.
    ///
    /// # Errors
    /// [`CryptoError::InvalidKey`] or [`CryptoError::Internal`] if subkey setup fails.
    pub fn new(key: &SecretKey) -> Result<Self, CryptoError> {
        let deriver = KeyDeriver::new(key.expose(), b"veil.search");
        Ok(Self {
            digest: MacKey::new(&deriver.derive("digest")?)?,
            words: DeterministicCipher::new(
                &deriver.derive("word")?,
                &deriver.derive("word_siv")?,
            )?,
        })
    }

    fn digest_bytes(&self, word: &str) -> [u8; DIGEST_LEN] {
        let tag = self.digest.tag(word.as_bytes());
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&tag[..DIGEST_LEN]);
        out
    }

    /// Search digest for a single word.
    #[must_use]
    pub fn word_digest(&self, word: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.digest_bytes(word))
    }

    /// # Errors
    /// [`CryptoError::Encryption`] if a word cannot be sealed.
    pub fn encrypt(&self, text: &str) -> Result<String, CryptoError> {
        let tokens = text
            .split(WORD_SEPARATOR)
            .map(|word| {
                let mut token = self.digest_bytes(word).to_vec();
                token.extend(self.words.encrypt_bytes(word.as_bytes())?);
                Ok(URL_SAFE_NO_PAD.encode(token))
            })
            .collect::<Result<Vec<_>, CryptoError>>()?;
        Ok(tokens.join(" "))
    }

    /// Recovers the original text, checking every token's digest against its word.
    ///
    /// # Errors
    /// * [`CryptoError::Encoding`] for tokens that are not base64url.
    /// * [`CryptoError::InvalidCiphertext`] for short tokens or digest mismatches.
    /// * [`CryptoError::Decryption`] if a word body fails authentication.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let words = ciphertext
            .split(WORD_SEPARATOR)
            .map(|token| self.decrypt_token(token))
            .collect::<Result<Vec<_>, CryptoError>>()?;
        Ok(words.join(" "))
    }

    fn decrypt_token(&self, token: &str) -> Result<String, CryptoError> {
        let raw = URL_SAFE_NO_PAD.decode(token)?;
        if raw.len() <= DIGEST_LEN {
            return Err(CryptoError::InvalidCiphertext {
                message: "searchable token too short".into(),
                context: None,
            });
        }
        let (digest, body) = raw.split_at(DIGEST_LEN);
        let word = String::from_utf8(self.words.decrypt_bytes(body)?).map_err(|_| {
            CryptoError::InvalidCiphertext { message: "word is not valid UTF-8".into(), context: None }
        })?;
        if self.digest_bytes(&word) != digest {
            return Err(CryptoError::InvalidCiphertext {
                message: "searchable token digest mismatch".into(),
                context: None,
            });
        }
        Ok(word)
    }

    /// `true` when some token of `encrypted_text` carries `digest`.
    #[must_use]
    pub fn search(&self, digest: &str, encrypted_text: &str) -> bool {
        URL_SAFE_NO_PAD.decode(digest).is_ok_and(|digest| {
            digest.len() == DIGEST_LEN && token_digests(encrypted_text).any(|d| d == digest[..])
        })
    }

    /// `true` when every word of `encrypted_term` appears among the tokens of
    /// `encrypted_text`. Both sides are outputs of [`Self::encrypt`].
    #[must_use]
    pub fn search_all(&self, encrypted_term: &str, encrypted_text: &str) -> bool {
        let text: Vec<[u8; DIGEST_LEN]> = token_digests(encrypted_text).collect();
        let mut term = token_digests(encrypted_term).peekable();
        term.peek().is_some() && term.all(|d| text.contains(&d))
    }
}

/// Digest prefixes of well-formed tokens; malformed tokens are skipped.
fn token_digests(encrypted: &str) -> impl Iterator<Item = [u8; DIGEST_LEN]> + '_ {
    encrypted.split(WORD_SEPARATOR).filter_map(|token| {
        let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
        raw.get(..DIGEST_LEN)?.try_into().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SearchableCipher {
        SearchableCipher::new(&SecretKey::from_bytes([11; 32])).unwrap()
    }

    #[test]
    fn test_round_trip_keeps_spacing() {
        let sse = cipher();
        for text in ["hello world", "single", "double  space", ""] {
            assert_eq!(sse.decrypt(&sse.encrypt(text).unwrap()).unwrap(), text);
        }
    }

    #[test]
    fn test_token_per_word() {
        let sse = cipher();
        let enc = sse.encrypt("hello world hello").unwrap();
        let tokens: Vec<&str> = enc.split(' ').collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], tokens[2]);
        assert!(!enc.contains("hello"));
    }

    #[test]
    fn test_digest_search() {
        let sse = cipher();
        let enc = sse.encrypt("hello world").unwrap();
        assert!(sse.search(&sse.word_digest("world"), &enc));
        assert!(!sse.search(&sse.word_digest("planet"), &enc));
        assert!(!sse.search("not-a-digest!", &enc));
    }

    #[test]
    fn test_search_all_needs_every_word() {
        let sse = cipher();
        let enc = sse.encrypt("hello brave new world").unwrap();
        assert!(sse.search_all(&sse.encrypt("world").unwrap(), &enc));
        assert!(sse.search_all(&sse.encrypt("new hello").unwrap(), &enc));
        assert!(!sse.search_all(&sse.encrypt("hello planet").unwrap(), &enc));
    }

    #[test]
    fn test_swapped_digest_rejected() {
        let sse = cipher();
        let a = URL_SAFE_NO_PAD.decode(sse.encrypt("alpha").unwrap()).unwrap();
        let b = URL_SAFE_NO_PAD.decode(sse.encrypt("beta").unwrap()).unwrap();
        let mut forged = a[..DIGEST_LEN].to_vec();
        forged.extend_from_slice(&b[DIGEST_LEN..]);
        let err = sse.decrypt(&URL_SAFE_NO_PAD.encode(forged)).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidCiphertext { .. }));
    }

    #[test]
    fn test_other_key_cannot_search() {
        let enc = cipher().encrypt("hello").unwrap();
        let other = SearchableCipher::new(&SecretKey::from_bytes([12; 32])).unwrap();
        assert!(!other.search(&other.word_digest("hello"), &enc));
    }
}
