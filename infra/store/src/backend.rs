use crate::builder::StoreBuilder;
use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::remote::RedisStore;
use crate::transport::{Expiry, ScoreBound, StoreTransport, Topology};

/// The store selected at startup.
#[derive(Debug, Clone)]
pub enum Store {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Self::Memory($store) => $call.await,
            Self::Redis($store) => $call.await,
        }
    };
}

impl StoreTransport for Store {
    fn topology(&self) -> Topology {
        match self {
            Self::Memory(store) => store.topology(),
            Self::Redis(store) => store.topology(),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        dispatch!(self, s => s.ping())
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), StoreError> {
        dispatch!(self, s => s.set(key, value, expiry))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.get(key))
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        dispatch!(self, s => s.del(key))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<u64, StoreError> {
        dispatch!(self, s => s.zadd(key, score, member))
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        dispatch!(self, s => s.zrange_by_score(key, min, max))
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        dispatch!(self, s => s.sadd(key, members))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        dispatch!(self, s => s.smembers(key))
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        dispatch!(self, s => s.flush_all())
    }
}
