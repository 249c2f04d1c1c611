//! # Crypto Errors
//!
//! [`CryptoError`] covers every failure raised by the primitives in this crate.

use std::borrow::Cow;

#[veil_derive::veil_error]
pub enum CryptoError {
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Authentication tag mismatch, wrong key, or tampered ciphertext.
    #[error("Decryption error{}: {message}", format_context(.context))]
    Decryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Key material is malformed or inconsistent.
    #[error("Invalid key{}: {message}", format_context(.context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Ciphertext is structurally valid but was not produced by this key.
    #[error("Invalid ciphertext{}: {message}", format_context(.context))]
    InvalidCiphertext { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Plaintext outside the domain a cipher supports.
    #[error("Value out of domain{}: {message}", format_context(.context))]
    OutOfDomain { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Encoding error{}: {source}", format_context(.context))]
    Encoding { source: base64::DecodeError, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Signature error{}: {source}", format_context(.context))]
    Signature { source: ed25519_dalek::SignatureError, context: Option<Cow<'static, str>> },

    /// The operating system random source failed.
    #[error("Entropy error{}: {message}", format_context(.context))]
    Entropy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal crypto error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<getrandom::Error> for CryptoError {
    fn from(err: getrandom::Error) -> Self {
        Self::Entropy { message: err.to_string().into(), context: None }
    }
}
