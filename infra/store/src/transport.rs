use crate::error::StoreError;
use std::fmt;
use std::future::Future;

/// How the backing store is deployed. Some commands are unavailable on a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    Single,
    Cluster,
}

/// Key time-to-live, passed through as `EX` or `PX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Seconds(u64),
    Millis(u64),
}

/// One end of a sorted-set score range. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Value(f64),
}

impl ScoreBound {
    /// `true` when `score` satisfies this bound used as a range minimum.
    #[must_use]
    pub fn admits_as_min(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => true,
            Self::PosInf => false,
            Self::Value(min) => score >= min,
        }
    }

    #[must_use]
    pub fn admits_as_max(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => false,
            Self::PosInf => true,
            Self::Value(max) => score <= max,
        }
    }
}

impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInf => f.write_str("-inf"),
            Self::PosInf => f.write_str("+inf"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// The command surface the proxy needs from a key-value store.
///
/// Implementations must be cheap to clone and safe to share across tasks. Every call is
/// an independent request/response round trip.
pub trait StoreTransport: Clone + Send + Sync + 'static {
    fn topology(&self) -> Topology;

    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set(
        &self,
        key: &str,
        value: &str,
        expiry: Option<Expiry>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Number of keys removed.
    fn del(&self, key: &str) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Number of members newly added (score updates count as zero).
    fn zadd(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Members with scores in `[min, max]`, ascending by score.
    fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> impl Future<Output = Result<Vec<(String, f64)>, StoreError>> + Send;

    /// Number of members newly added.
    fn sadd(
        &self,
        key: &str,
        members: &[String],
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn smembers(&self, key: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn flush_all(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
