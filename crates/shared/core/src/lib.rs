//! # Veil Core
//!
//! The encrypting layer between the front ends and the store.
//!
//! * [`KeyRing`]: every key, derived once from a master secret.
//! * [`ValueCodec`]: the signed and hashed `TYPE|payload|signature|hash` value envelope.
//! * [`SecureStore`]: the command dispatcher, generic over any
//!   [`StoreTransport`](veil_store::StoreTransport).
//!
//! ## Example
//!
//! ```rust
//! use veil_core::{KeyRing, SecureStore};
//! use veil_domain::{SchemeConfig, ValueScheme};
//! use veil_store::Store;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let keys = KeyRing::builder().secret("master secret", "salt").build()?;
//! let scheme = SchemeConfig { values: ValueScheme::Envelope, ..SchemeConfig::default() };
//! let store = SecureStore::new(Store::builder().memory().build(), keys, scheme)?;
//!
//! store.set("user:1", "42", None).await?;
//! assert_eq!(store.get("user:1").await?.as_deref(), Some("42"));
//! # Ok::<(), veil_core::VeilError>(())
//! # }).unwrap();
//! ```

pub mod bootstrap;
pub mod config;
pub mod envelope;
mod error;
mod keys;
mod service;

pub use envelope::{SecureValue, ValueCodec, ValueTag, WireForm};
pub use error::{VeilError, VeilErrorExt};
pub use keys::{KeyRing, KeyRingBuilder, NoSecret, WithSecret};
pub use service::SecureStore;
