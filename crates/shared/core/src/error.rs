//! # Errors
//!
//! [`VeilError`] is the single error type returned by the dispatcher. Front ends map
//! its variants to replies; see [`VeilError::is_security_violation`].

use std::borrow::Cow;
use veil_crypto::CryptoError;
use veil_store::StoreError;

#[veil_derive::veil_error]
pub enum VeilError {
    /// Malformed client input: bad score or bound, non-numeric operand, arithmetic on a
    /// non-numeric value, overflow.
    #[error("Invalid input{}: {message}", format_context(.context))]
    InvalidInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored value was modified or is not a value this proxy wrote.
    #[error("Integrity violation{}: {message}", format_context(.context))]
    IntegrityViolation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored value passed the integrity check but its signature did not verify.
    #[error("Authenticity violation{}: {message}", format_context(.context))]
    AuthenticityViolation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unsupported operation{}: {message}", format_context(.context))]
    Unsupported { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Store error{}: {source}", format_context(.context))]
    Store {
        #[source]
        source: StoreError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Crypto error{}: {source}", format_context(.context))]
    Crypto {
        #[source]
        source: CryptoError,
        context: Option<Cow<'static, str>>,
    },

    /// Missing or malformed key material, or an unusable scheme combination.
    #[error("Configuration error{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VeilError {
    /// Tampering or forgery was detected. Such errors must never be shown to clients in
    /// detail, and are always logged.
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. } | Self::AuthenticityViolation { .. })
    }

    pub(crate) fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidInput { message: message.into(), context: None }
    }

    pub(crate) fn integrity(message: impl Into<Cow<'static, str>>) -> Self {
        Self::IntegrityViolation { message: message.into(), context: None }
    }

    pub(crate) fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration { message: message.into(), context: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_classification() {
        assert!(VeilError::integrity("x").is_security_violation());
        assert!(
            VeilError::AuthenticityViolation { message: "x".into(), context: None }
                .is_security_violation()
        );
        assert!(!VeilError::invalid_input("x").is_security_violation());
    }

    #[test]
    fn test_context_and_kind() {
        let err: Result<(), VeilError> = Err(VeilError::invalid_input("score must be an integer"));
        let err = err.context("zadd").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input (zadd): score must be an integer");
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn test_lower_layer_conversion() {
        let err: VeilError =
            StoreError::Timeout { message: "slow".into(), context: None }.into();
        assert!(matches!(err, VeilError::Store { .. }));
    }
}
