use veil_core::SecureStore;
use veil_store::Store;

/// Shared by every handler. Cloning is cheap.
pub type ApiState = SecureStore<Store>;
