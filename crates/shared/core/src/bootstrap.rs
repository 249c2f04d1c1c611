use crate::error::{VeilError, VeilErrorExt};
use crate::keys::KeyRing;
use crate::service::SecureStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use veil_domain::ValueScheme;
use veil_domain::config::{AppConfig, KeysConfig, StoreBackend, StoreConfig, StoreTopology};
use veil_store::{Store, TlsPaths, Topology};

/// Builds the key ring described by `keys`.
///
/// # Errors
/// [`VeilError::Configuration`] for missing or malformed key material, including a
/// homomorphic value scheme without a Paillier key.
pub fn key_ring(keys: &KeysConfig, values: ValueScheme) -> Result<Arc<KeyRing>, VeilError> {
    let builder = match keys.homomorphic_key.as_deref().filter(|k| !k.is_empty()) {
        Some(encoded) => KeyRing::builder().paillier_str(encoded)?,
        None if values == ValueScheme::Homomorphic => {
            return Err(VeilError::Configuration {
                message: "the homomorphic value scheme needs a Paillier key".into(),
                context: Some("keys.homomorphic_key".into()),
            });
        },
        None => KeyRing::builder(),
    };
    builder.secret(&keys.master_secret, &keys.salt).build()
}

/// Connects to the store described by `config`.
///
/// # Errors
/// [`VeilError::Store`] if the connection cannot be established.
pub async fn connect_store(config: &StoreConfig) -> Result<Store, VeilError> {
    let topology = match config.topology {
        StoreTopology::Single => Topology::Single,
        StoreTopology::Cluster => Topology::Cluster,
    };

    if config.backend == StoreBackend::Memory {
        return Ok(Store::builder().memory().topology(topology).build());
    }

    let mut builder = match topology {
        Topology::Single => Store::builder().redis(&config.host, config.port),
        Topology::Cluster if config.nodes.is_empty() => {
            Store::builder().cluster([format!("{}:{}", config.host, config.port)])?
        },
        Topology::Cluster => Store::builder().cluster(&config.nodes)?,
    };
    if let Some(password) = &config.password {
        builder = builder.auth(config.username.clone(), password);
    }
    if let Some(tls) = &config.tls {
        builder = builder.tls(TlsPaths {
            ca_cert: tls.ca_cert.clone(),
            client_cert: tls.client_cert.clone(),
            client_key: tls.client_key.clone(),
        });
    }

    let store = builder
        .retries(config.connect_retries)
        .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
        .response_timeout(Duration::from_millis(config.response_timeout_ms))
        .connect()
        .await
        .context("store connection")?;
    info!(host = %config.host, port = config.port, topology = ?topology, "Connected to store");
    Ok(store)
}

/// Builds the key ring, connects the store and assembles the dispatcher.
///
/// # Errors
/// As [`key_ring`] and [`connect_store`].
pub async fn secure_store(config: &AppConfig) -> Result<SecureStore<Store>, VeilError> {
    let keys = key_ring(&config.keys, config.scheme.values)?;
    let store = connect_store(&config.store).await?;
    SecureStore::new(store, keys, config.scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_store::StoreTransport;

    fn keys() -> KeysConfig {
        KeysConfig { master_secret: "master".into(), salt: "salt".into(), homomorphic_key: None }
    }

    #[test]
    fn test_homomorphic_scheme_needs_paillier_key() {
        let err = key_ring(&keys(), ValueScheme::Homomorphic).unwrap_err();
        assert!(matches!(err, VeilError::Configuration { .. }));
        assert!(key_ring(&keys(), ValueScheme::Envelope).is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            topology: StoreTopology::Cluster,
            ..StoreConfig::default()
        };
        let store = connect_store(&config).await.unwrap();
        assert_eq!(store.topology(), Topology::Cluster);
    }
}
