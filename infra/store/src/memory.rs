use crate::error::StoreError;
use crate::transport::{Expiry, ScoreBound, StoreTransport, Topology};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WRONG_TYPE: &str = "Operation against a key holding the wrong kind of value";

#[derive(Debug)]
enum Value {
    String(String),
    SortedSet(FxHashMap<String, f64>),
    Set(FxHashSet<String>),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct MemoryInner {
    entries: Mutex<FxHashMap<String, Entry>>,
}

/// Process-local store with Redis semantics for the commands the proxy issues.
///
/// Used for tests and for running the proxy without a Redis server. Expired keys are
/// dropped lazily on access.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
    topology: Topology,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `topology` to callers, so cluster-only restrictions can be exercised locally.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Every live key together with its stored strings (value, or set / sorted-set members).
    #[must_use]
    pub fn dump(&self) -> Vec<(String, Vec<String>)> {
        let now = Instant::now();
        let entries = self.inner.entries.lock();
        let mut out: Vec<(String, Vec<String>)> = entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| {
                let mut values: Vec<String> = match &entry.value {
                    Value::String(v) => vec![v.clone()],
                    Value::SortedSet(z) => z.keys().cloned().collect(),
                    Value::Set(s) => s.iter().cloned().collect(),
                };
                values.sort_unstable();
                (key.clone(), values)
            })
            .collect();
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Runs `f` on the live entry at `key`, dropping it first if it has expired.
    fn with_entries<R>(&self, key: &str, f: impl FnOnce(&mut FxHashMap<String, Entry>) -> R) -> R {
        let mut entries = self.inner.entries.lock();
        if entries.get(key).is_some_and(|entry| !entry.is_live(Instant::now())) {
            entries.remove(key);
        }
        f(&mut entries)
    }

    fn wrong_type(key: &str) -> StoreError {
        StoreError::WrongType { message: WRONG_TYPE.into(), context: Some(key.to_owned().into()) }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.inner.entries.lock().len())
            .field("topology", &self.topology)
            .finish()
    }
}

impl StoreTransport for MemoryStore {
    fn topology(&self) -> Topology {
        self.topology
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), StoreError> {
        let expires_at = expiry.map(|expiry| {
            Instant::now()
                + match expiry {
                    Expiry::Seconds(s) => Duration::from_secs(s),
                    Expiry::Millis(ms) => Duration::from_millis(ms),
                }
        });
        self.inner
            .entries
            .lock()
            .insert(key.to_owned(), Entry { value: Value::String(value.to_owned()), expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(Entry { value: Value::String(v), .. }) => Ok(Some(v.clone())),
            Some(_) => Err(Self::wrong_type(key)),
        })
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.with_entries(key, |entries| u64::from(entries.remove(key).is_some())))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<u64, StoreError> {
        self.with_entries(key, |entries| {
            let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Value::SortedSet(FxHashMap::default()),
                expires_at: None,
            });
            let Value::SortedSet(zset) = &mut entry.value else {
                return Err(Self::wrong_type(key));
            };
            Ok(u64::from(zset.insert(member.to_owned(), score).is_none()))
        })
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry { value: Value::SortedSet(zset), .. }) => {
                let mut range: Vec<(String, f64)> = zset
                    .iter()
                    .filter(|&(_, &score)| min.admits_as_min(score) && max.admits_as_max(score))
                    .map(|(member, &score)| (member.clone(), score))
                    .collect();
                range.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(range)
            },
            Some(_) => Err(Self::wrong_type(key)),
        })
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        self.with_entries(key, |entries| {
            let entry = entries
                .entry(key.to_owned())
                .or_insert_with(|| Entry { value: Value::Set(FxHashSet::default()), expires_at: None });
            let Value::Set(set) = &mut entry.value else {
                return Err(Self::wrong_type(key));
            };
            Ok(members.iter().map(|m| u64::from(set.insert(m.clone()))).sum())
        })
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry { value: Value::Set(set), .. }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(Self::wrong_type(key)),
        })
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.inner.entries.lock().clear();
        Ok(())
    }
}
