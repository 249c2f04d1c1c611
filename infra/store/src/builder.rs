use crate::backend::Store;
use crate::error::{StoreError, StoreErrorExt};
use crate::memory::MemoryStore;
use crate::remote::{RedisOptions, RedisStore, TlsMaterial};
use crate::transport::{StoreTransport, Topology};
use private::Sealed;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// TLS file locations, read when the builder connects.
#[derive(Debug, Clone, Default)]
pub struct TlsPaths {
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

impl TlsPaths {
    async fn load(&self) -> Result<TlsMaterial, StoreError> {
        async fn read(path: Option<&PathBuf>) -> Result<Option<Vec<u8>>, StoreError> {
            match path {
                Some(path) => tokio::fs::read(path)
                    .await
                    .context(format!("Reading {}", path.display()))
                    .map(Some),
                None => Ok(None),
            }
        }

        Ok(TlsMaterial {
            root_cert: read(self.ca_cert.as_ref()).await?,
            client_cert: read(self.client_cert.as_ref()).await?,
            client_key: read(self.client_key.as_ref()).await?,
        })
    }
}

#[derive(Debug, Default)]
pub struct NoBackend;
#[derive(Debug)]
pub struct Memory(Topology);
#[derive(Debug)]
pub struct Redis(RedisConfig);

#[derive(Debug)]
struct RedisConfig {
    nodes: Vec<(String, u16)>,
    topology: Topology,
    username: Option<String>,
    password: Option<String>,
    tls: Option<TlsPaths>,
    retries: u32,
    connection_timeout: Duration,
    response_timeout: Duration,
}

mod private {
    pub trait Sealed {}
}
impl Sealed for NoBackend {}
impl Sealed for Memory {}
impl Sealed for Redis {}

/// Fluent builder for a [`Store`]. Pick a backend first, then connect.
#[must_use = "builders do nothing unless you call .build() or .connect()"]
#[derive(Debug, Default)]
pub struct StoreBuilder<B: Sealed = NoBackend> {
    backend: B,
}

impl StoreBuilder<NoBackend> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-local backend; nothing leaves the process.
    pub const fn memory(self) -> StoreBuilder<Memory> {
        StoreBuilder { backend: Memory(Topology::Single) }
    }

    /// A single Redis node.
    pub fn redis(self, host: impl Into<String>, port: u16) -> StoreBuilder<Redis> {
        StoreBuilder {
            backend: Redis(RedisConfig {
                nodes: vec![(host.into(), port)],
                topology: Topology::Single,
                username: None,
                password: None,
                tls: None,
                retries: DEFAULT_RETRIES,
                connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
                response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            }),
        }
    }

    /// A Redis cluster reached through `host:port` seed nodes.
    ///
    /// # Errors
    /// [`StoreError::Validation`] if the list is empty or a node is not `host:port`.
    pub fn cluster<I, S>(self, nodes: I) -> Result<StoreBuilder<Redis>, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes =
            nodes.into_iter().map(|node| parse_node(node.as_ref())).collect::<Result<Vec<_>, _>>()?;
        if nodes.is_empty() {
            return Err(StoreError::Validation {
                message: "cluster requires at least one seed node".into(),
                context: None,
            });
        }

        let mut builder = self.redis("", 0);
        builder.backend.0.nodes = nodes;
        builder.backend.0.topology = Topology::Cluster;
        Ok(builder)
    }
}

impl StoreBuilder<Memory> {
    /// Reports `topology`, so cluster-only restrictions can be exercised without a cluster.
    pub const fn topology(mut self, topology: Topology) -> Self {
        self.backend.0 = topology;
        self
    }

    pub fn build(self) -> Store {
        info!(topology = ?self.backend.0, "In-memory store ready");
        Store::Memory(MemoryStore::new().with_topology(self.backend.0))
    }
}

impl StoreBuilder<Redis> {
    pub fn auth(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.backend.0.username = username;
        self.backend.0.password = Some(password.into());
        self
    }

    pub fn tls(mut self, paths: TlsPaths) -> Self {
        self.backend.0.tls = Some(paths);
        self
    }

    /// Attempts made before giving up on the initial `PING`. Zero is treated as one.
    pub const fn retries(mut self, retries: u32) -> Self {
        self.backend.0.retries = retries;
        self
    }

    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.backend.0.connection_timeout = timeout;
        self
    }

    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.backend.0.response_timeout = timeout;
        self
    }

    /// Opens the connection and waits for the store to answer `PING`.
    ///
    /// Connecting and pinging are retried with exponential backoff starting at 500ms.
    ///
    /// # Errors
    /// * [`StoreError::Io`] if TLS files cannot be read.
    /// * [`StoreError::Validation`] for inconsistent TLS material.
    /// * [`StoreError::Connection`] if the store is still unreachable after the last attempt.
    #[instrument(skip(self), fields(topology = ?self.backend.0.topology, nodes = self.backend.0.nodes.len()))]
    pub async fn connect(self) -> Result<Store, StoreError> {
        let config = self.backend.0;
        let tls = match &config.tls {
            Some(paths) => Some(paths.load().await?),
            None => None,
        };
        let options = RedisOptions {
            nodes: config.nodes,
            topology: config.topology,
            username: config.username,
            password: config.password,
            tls,
            connection_timeout: config.connection_timeout,
            response_timeout: config.response_timeout,
        };

        let attempts = config.retries.max(1);
        let mut delay = INITIAL_BACKOFF;
        for attempt in 1..=attempts {
            let result = match RedisStore::connect(&options).await {
                Ok(store) => store.ping().await.map(|()| store),
                Err(err) => Err(err),
            };
            match result {
                Ok(store) => {
                    info!(attempt, "Store is ready");
                    return Ok(Store::Redis(store));
                },
                Err(err @ StoreError::Validation { .. }) => return Err(err),
                Err(err) if attempt == attempts => {
                    return Err(StoreError::Connection {
                        message: format!("unreachable after {attempts} attempts: {err}").into(),
                        context: options.nodes.first().map(|(h, p)| format!("{h}:{p}").into()),
                    });
                },
                Err(err) => {
                    warn!(attempt, ?delay, error = %err, "Store not ready, retrying...");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                },
            }
        }

        Err(StoreError::Internal { message: "retry loop exited without result".into(), context: None })
    }
}

fn parse_node(node: &str) -> Result<(String, u16), StoreError> {
    let invalid = || StoreError::Validation {
        message: "cluster node must be host:port".into(),
        context: Some(node.to_owned().into()),
    };
    let (host, port) = node.trim().rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_owned(), port))
}
