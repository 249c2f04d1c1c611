use crate::scheme::SchemeConfig;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration shared by the server and the shell.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfigInner {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub keys: KeysConfig,
    pub scheme: SchemeConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(flatten, default)]
    inner: Arc<AppConfigInner>,
}

impl Deref for AppConfig {
    type Target = AppConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AppConfig {
    fn deref_mut(&mut self) -> &mut AppConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub tls: Option<ServerTlsConfig>,
}

/// PEM certificate/key paths for the HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerTlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreTopology {
    #[default]
    Single,
    Cluster,
}

/// Backing store connection.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<StoreTlsConfig>,
    pub topology: StoreTopology,
    /// Cluster seed nodes as `host:port`.
    pub nodes: Vec<String>,
    pub connect_retries: u32,
    pub connection_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

/// CA bundle and optional client identity for TLS to the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreTlsConfig {
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

/// Key material. Every symmetric key is derived from `master_secret` and `salt`.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub master_secret: String,
    pub salt: String,
    /// Serialized Paillier key; required by the homomorphic value scheme.
    pub homomorphic_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub dir: Option<PathBuf>,
}

// --- Debug (secrets redacted) ---

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "[redacted]",
        _ => "[unset]",
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(self.password.as_deref()))
            .field("tls", &self.tls)
            .field("topology", &self.topology)
            .field("nodes", &self.nodes)
            .field("connect_retries", &self.connect_retries)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("response_timeout_ms", &self.response_timeout_ms)
            .finish()
    }
}

impl fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysConfig")
            .field("master_secret", &redact(Some(&self.master_secret)))
            .field("salt", &redact(Some(&self.salt)))
            .field("homomorphic_key", &redact(self.homomorphic_key.as_deref()))
            .finish()
    }
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8080, tls: None }
    }
}

impl Default for ServerTlsConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            host: "localhost".to_owned(),
            port: 6379,
            username: None,
            password: None,
            tls: None,
            topology: StoreTopology::Single,
            nodes: Vec::new(),
            connect_retries: 3,
            connection_timeout_ms: 5_000,
            response_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), json: false, dir: None }
    }
}
