//! # Store Transport
//!
//! The key-value backend behind the veil proxy. Everything above this crate talks to
//! the [`StoreTransport`] trait and never sees plaintext-aware logic; values arriving here
//! are already encrypted.
//!
//! ## Backends
//! - **Redis**: a multiplexed single-node connection or an async cluster connection, with
//!   optional TLS (CA bundle, client certificate) and ACL credentials.
//! - **Memory**: a process-local map with Redis semantics for the commands the proxy uses.
//!
//! ## Example
//!
//! ```rust
//! use veil_store::{Store, StoreError, StoreTransport};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), StoreError> {
//!     let store = Store::builder().memory().build();
//!     store.set("k", "v", None).await?;
//!     assert_eq!(store.get("k").await?.as_deref(), Some("v"));
//!     Ok(())
//! }
//! ```

mod backend;
mod builder;
mod error;
mod memory;
mod remote;
mod transport;

pub use backend::Store;
pub use builder::{Memory, NoBackend, Redis, StoreBuilder, TlsPaths};
pub use error::{StoreError, StoreErrorExt};
pub use memory::MemoryStore;
pub use remote::{RedisStore, TlsMaterial};
pub use transport::{Expiry, ScoreBound, StoreTransport, Topology};
