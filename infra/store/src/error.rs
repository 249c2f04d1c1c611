use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[veil_derive::veil_error]
pub enum StoreError {
    /// Builder parameters are missing or malformed.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Occurs when the store cannot be reached or stays unhealthy.
    #[error("Store connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A command did not complete within the response timeout.
    #[error("Store timeout{}: {message}", format_context(.context))]
    Timeout { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Command issued against a key holding another data type.
    #[error("Wrong type{}: {message}", format_context(.context))]
    WrongType { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A wrapper for errors reported by the Redis client.
    #[error("Redis error{}: {source}", format_context(.context))]
    Redis {
        #[source]
        source: redis::RedisError,
        context: Option<Cow<'static, str>>,
    },

    /// Reading TLS material from disk failed.
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
