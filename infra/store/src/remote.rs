use crate::error::{StoreError, StoreErrorExt};
use crate::transport::{Expiry, ScoreBound, StoreTransport, Topology};
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{
    Client, ClientTlsConfig, Cmd, ConnectionAddr, ConnectionInfo, FromRedisValue,
    RedisConnectionInfo, TlsCertificates,
};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// PEM-encoded TLS material for the store connection.
#[derive(Clone, Default)]
pub struct TlsMaterial {
    pub root_cert: Option<Vec<u8>>,
    pub client_cert: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
}

impl TlsMaterial {
    fn certificates(&self) -> Result<TlsCertificates, StoreError> {
        let client_tls = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) => {
                Some(ClientTlsConfig { client_cert: cert.clone(), client_key: key.clone() })
            },
            (None, None) => None,
            _ => {
                return Err(StoreError::Validation {
                    message: "client certificate and key must be provided together".into(),
                    context: None,
                });
            },
        };
        Ok(TlsCertificates { client_tls, root_cert: self.root_cert.clone() })
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("root_cert", &self.root_cert.is_some())
            .field("client_cert", &self.client_cert.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolved connection parameters for [`RedisStore::connect`].
#[derive(Debug, Clone)]
pub(crate) struct RedisOptions {
    pub(crate) nodes: Vec<(String, u16)>,
    pub(crate) topology: Topology,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) tls: Option<TlsMaterial>,
    pub(crate) connection_timeout: Duration,
    pub(crate) response_timeout: Duration,
}

impl RedisOptions {
    fn connection_info(&self, host: &str, port: u16) -> ConnectionInfo {
        let addr = if self.tls.is_some() {
            ConnectionAddr::TcpTls { host: host.to_owned(), port, insecure: false, tls_params: None }
        } else {
            ConnectionAddr::Tcp(host.to_owned(), port)
        };
        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

#[derive(Clone)]
enum Connection {
    Single(MultiplexedConnection),
    Cluster(ClusterConnection),
}

/// Redis adapter over a multiplexed (single node) or cluster connection.
///
/// Both connection kinds are cloneable handles; each command clones the handle, so
/// concurrent callers never wait on each other for a connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: Connection,
    topology: Topology,
    response_timeout: Duration,
}

impl RedisStore {
    pub(crate) async fn connect(options: &RedisOptions) -> Result<Self, StoreError> {
        let conn = match options.topology {
            Topology::Single => {
                let (host, port) = options.nodes.first().ok_or(StoreError::Validation {
                    message: "a host is required".into(),
                    context: None,
                })?;
                let info = options.connection_info(host, *port);
                let client = match &options.tls {
                    Some(tls) => Client::build_with_tls(info, tls.certificates()?)
                        .context("Building TLS client")?,
                    None => Client::open(info).context("Building client")?,
                };
                let conn = timeout(
                    options.connection_timeout,
                    client.get_multiplexed_async_connection(),
                )
                .await
                .map_err(|_| connect_timeout(options.connection_timeout))?
                .context("Opening multiplexed connection")?;
                Connection::Single(conn)
            },
            Topology::Cluster => {
                let nodes: Vec<ConnectionInfo> = options
                    .nodes
                    .iter()
                    .map(|(host, port)| options.connection_info(host, *port))
                    .collect();
                let mut builder = ClusterClient::builder(nodes);
                if let Some(username) = &options.username {
                    builder = builder.username(username.clone());
                }
                if let Some(password) = &options.password {
                    builder = builder.password(password.clone());
                }
                if let Some(tls) = &options.tls {
                    builder = builder.certs(tls.certificates()?);
                }
                let client = builder.build().context("Building cluster client")?;
                let conn = timeout(options.connection_timeout, client.get_async_connection())
                    .await
                    .map_err(|_| connect_timeout(options.connection_timeout))?
                    .context("Opening cluster connection")?;
                Connection::Cluster(conn)
            },
        };

        info!(topology = ?options.topology, nodes = options.nodes.len(), "Redis connection opened");
        Ok(Self { conn, topology: options.topology, response_timeout: options.response_timeout })
    }

    async fn query<T: FromRedisValue>(&self, cmd: Cmd, name: &'static str) -> Result<T, StoreError> {
        debug!(command = name, "Redis command");
        let exec = async {
            match self.conn.clone() {
                Connection::Single(mut conn) => cmd.query_async(&mut conn).await,
                Connection::Cluster(mut conn) => cmd.query_async(&mut conn).await,
            }
        };
        timeout(self.response_timeout, exec)
            .await
            .map_err(|_| StoreError::Timeout {
                message: format!("no reply within {:?}", self.response_timeout).into(),
                context: Some(name.into()),
            })?
            .context(name)
    }
}

fn connect_timeout(limit: Duration) -> StoreError {
    StoreError::Timeout {
        message: format!("no connection within {limit:?}").into(),
        context: Some("connect".into()),
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("topology", &self.topology)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl StoreTransport for RedisStore {
    fn topology(&self) -> Topology {
        self.topology
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let _: String = self.query(redis::cmd("PING"), "PING").await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        match expiry {
            Some(Expiry::Seconds(s)) => {
                cmd.arg("EX").arg(s);
            },
            Some(Expiry::Millis(ms)) => {
                cmd.arg("PX").arg(ms);
            },
            None => {},
        }
        self.query(cmd, "SET").await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(cmd, "GET").await
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query(cmd, "DEL").await
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key).arg(score).arg(member);
        self.query(cmd, "ZADD").await
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut cmd = redis::cmd("ZRANGEBYSCORE");
        cmd.arg(key).arg(min.to_string()).arg(max.to_string()).arg("WITHSCORES");
        self.query(cmd, "ZRANGEBYSCORE").await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(members);
        self.query(cmd, "SADD").await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query(cmd, "SMEMBERS").await
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.query(redis::cmd("FLUSHALL"), "FLUSHALL").await
    }
}
