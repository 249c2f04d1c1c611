//! The encrypted command dispatcher.
//!
//! Every operation encrypts the key deterministically, transforms the value, member or
//! score according to the active [`SchemeConfig`], runs one store command and reverses
//! the transform on the way back. The dispatcher holds no mutable state.

use crate::envelope::{NON_NUMERIC, ValueCodec, WireForm};
use crate::error::VeilError;
use crate::keys::KeyRing;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use veil_crypto::BigInt;
use veil_crypto::ope::{MAX_PLAINTEXT, MIN_PLAINTEXT};
use veil_crypto::paillier;
use veil_domain::{MemberScheme, SchemeConfig, ScoreScheme, ScoredMember, Status, ValueScheme};
use veil_store::{Expiry, ScoreBound, StoreTransport, Topology};

/// Largest integer magnitude a sorted-set score (an IEEE double) holds exactly.
const EXACT_SCORE_LIMIT: i64 = 1 << 53;

#[derive(Debug, Clone, Copy)]
enum Arithmetic {
    Sum,
    Diff,
    Mult,
}

impl Arithmetic {
    const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Diff => "diff",
            Self::Mult => "mult",
        }
    }

    const fn apply(self, current: i64, operand: i64) -> Option<i64> {
        match self {
            Self::Sum => current.checked_add(operand),
            Self::Diff => current.checked_sub(operand),
            Self::Mult => current.checked_mul(operand),
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    transport: T,
    keys: Arc<KeyRing>,
    scheme: SchemeConfig,
    values: Option<ValueCodec>,
    members: Option<ValueCodec>,
}

/// Encrypting front for a [`StoreTransport`]. Cheap to clone.
#[derive(Debug)]
pub struct SecureStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SecureStore<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: StoreTransport> SecureStore<T> {
    /// # Errors
    /// [`VeilError::Configuration`] when the homomorphic value scheme is selected without a
    /// Paillier key.
    pub fn new(transport: T, keys: Arc<KeyRing>, scheme: SchemeConfig) -> Result<Self, VeilError> {
        let values = match scheme.values {
            ValueScheme::Plain => None,
            ValueScheme::Envelope => {
                Some(ValueCodec::new(Arc::clone(&keys), WireForm::Untagged, false)?)
            },
            ValueScheme::Homomorphic => {
                Some(ValueCodec::new(Arc::clone(&keys), WireForm::Tagged, true)?)
            },
        };
        let members = match scheme.members {
            MemberScheme::Searchable => None,
            MemberScheme::Envelope => {
                let form = if scheme.values == ValueScheme::Homomorphic {
                    WireForm::Tagged
                } else {
                    WireForm::Untagged
                };
                Some(ValueCodec::new(Arc::clone(&keys), form, false)?)
            },
        };

        debug!(
            values = scheme.values.as_str(),
            members = scheme.members.as_str(),
            scores = scheme.scores.as_str(),
            topology = ?transport.topology(),
            "Secure store ready"
        );
        Ok(Self { inner: Arc::new(Inner { transport, keys, scheme, values, members }) })
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    #[must_use]
    pub fn scheme(&self) -> SchemeConfig {
        self.inner.scheme
    }

    /// Checks that the store answers.
    ///
    /// # Errors
    /// [`VeilError::Store`] if it does not.
    pub async fn ping(&self) -> Result<(), VeilError> {
        Ok(self.inner.transport.ping().await?)
    }

    /// # Errors
    /// [`VeilError::Crypto`] or [`VeilError::Store`].
    #[instrument(level = "debug", skip_all)]
    pub async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), VeilError> {
        let key = self.encrypt_key(key)?;
        let value = self.encode_value(value)?;
        Ok(self.inner.transport.set(&key, &value, expiry).await?)
    }

    /// `None` when the key does not exist.
    ///
    /// # Errors
    /// Security violations if the stored value fails verification.
    #[instrument(level = "debug", skip_all)]
    pub async fn get(&self, key: &str) -> Result<Option<String>, VeilError> {
        let result = async {
            let key = self.encrypt_key(key)?;
            match self.inner.transport.get(&key).await? {
                Some(stored) => self.decode_value(&stored).map(Some),
                None => Ok(None),
            }
        };
        observe("get", result.await)
    }

    /// # Errors
    /// [`VeilError::Crypto`] or [`VeilError::Store`].
    #[instrument(level = "debug", skip_all)]
    pub async fn del(&self, key: &str) -> Result<Status, VeilError> {
        let key = self.encrypt_key(key)?;
        Ok(Status::from_count(self.inner.transport.del(&key).await?))
    }

    /// Adds `member` with an integer `score`. `Ok` when the member is new.
    ///
    /// # Errors
    /// [`VeilError::InvalidInput`] if `score` is not an integer in the score domain.
    #[instrument(level = "debug", skip_all)]
    pub async fn zadd(&self, key: &str, score: &str, member: &str) -> Result<Status, VeilError> {
        let score: i64 = score.trim().parse().map_err(|_| VeilError::InvalidInput {
            message: "score must be an integer".into(),
            context: Some("zadd".into()),
        })?;
        let score = self.encrypt_score(score)?;
        let key = self.encrypt_key(key)?;
        let member = self.encode_member(member)?;
        Ok(Status::from_count(self.inner.transport.zadd(&key, score, &member).await?))
    }

    /// Members with scores in `[min, max]`, ascending. Bounds are integers, `-inf`, `inf`
    /// or `+inf`, and are interpreted independently of each other.
    ///
    /// # Errors
    /// * [`VeilError::InvalidInput`] for a malformed bound.
    /// * Security violations if a stored member or score fails verification.
    #[instrument(level = "debug", skip_all)]
    pub async fn zrange_by_score(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<ScoredMember>, VeilError> {
        let min = self.encrypt_bound(min)?;
        let max = self.encrypt_bound(max)?;
        let result = async {
            let key = self.encrypt_key(key)?;
            let entries = self.inner.transport.zrange_by_score(&key, min, max).await?;
            entries
                .into_iter()
                .map(|(member, score)| {
                    Ok(ScoredMember::new(self.decode_value(&member)?, self.decrypt_score(score)?))
                })
                .collect::<Result<Vec<_>, VeilError>>()
        };
        observe("zrangebyscore", result.await)
    }

    /// Adds `operand` to the integer stored at `key`.
    ///
    /// # Errors
    /// See [`Self::mult`].
    pub async fn sum(&self, key: &str, operand: &str) -> Result<(), VeilError> {
        self.arithmetic(Arithmetic::Sum, key, operand).await
    }

    /// Subtracts `operand` from the integer stored at `key`.
    ///
    /// # Errors
    /// See [`Self::mult`].
    pub async fn diff(&self, key: &str, operand: &str) -> Result<(), VeilError> {
        self.arithmetic(Arithmetic::Diff, key, operand).await
    }

    /// Multiplies the integer stored at `key` by `operand`.
    ///
    /// # Errors
    /// * [`VeilError::NotFound`] if `key` does not exist.
    /// * [`VeilError::InvalidInput`] for a non-integer operand, a stored value that is not
    ///   an integer, or overflow.
    /// * Security violations if the stored value fails verification.
    pub async fn mult(&self, key: &str, operand: &str) -> Result<(), VeilError> {
        self.arithmetic(Arithmetic::Mult, key, operand).await
    }

    #[instrument(level = "debug", skip_all, fields(op = op.name()))]
    async fn arithmetic(&self, op: Arithmetic, key: &str, operand: &str) -> Result<(), VeilError> {
        let operand: i64 = operand.trim().parse().map_err(|_| VeilError::InvalidInput {
            message: "operand must be an integer".into(),
            context: Some(op.name().into()),
        })?;

        let result = async {
            let key = self.encrypt_key(key)?;
            let stored = self.inner.transport.get(&key).await?.ok_or_else(|| VeilError::NotFound {
                message: "key does not exist".into(),
                context: Some(op.name().into()),
            })?;

            let updated = match (&self.inner.values, self.inner.scheme.values) {
                (Some(codec), ValueScheme::Homomorphic) => {
                    let current = codec.open_add(&stored)?;
                    codec.reseal_add(&self.homomorphic(op, &current, operand)?)?
                },
                _ => {
                    let current: i64 = self
                        .decode_value(&stored)?
                        .trim()
                        .parse()
                        .map_err(|_| VeilError::InvalidInput {
                            message: NON_NUMERIC.into(),
                            context: Some(op.name().into()),
                        })?;
                    let next = op.apply(current, operand).ok_or_else(|| {
                        VeilError::InvalidInput {
                            message: "integer overflow".into(),
                            context: Some(op.name().into()),
                        }
                    })?;
                    self.encode_value(&next.to_string())?
                },
            };
            self.inner.transport.set(&key, &updated, None).await?;
            Ok::<(), VeilError>(())
        };
        observe(op.name(), result.await)
    }

    fn homomorphic(
        &self,
        op: Arithmetic,
        current: &BigInt,
        operand: i64,
    ) -> Result<BigInt, VeilError> {
        let key = self
            .inner
            .keys
            .paillier()
            .ok_or_else(|| VeilError::configuration("no Paillier key loaded"))?;
        let expected = match op {
            Arithmetic::Sum => key.decrypt(current)? + operand,
            Arithmetic::Diff => key.decrypt(current)? - operand,
            Arithmetic::Mult => key.decrypt(current)? * operand,
        };
        if !key.in_domain(&expected) {
            return Err(VeilError::InvalidInput {
                message: "integer overflow".into(),
                context: Some(op.name().into()),
            });
        }
        let nsquare = key.nsquare();
        Ok(match op {
            Arithmetic::Sum => paillier::add(current, &key.encrypt(&BigInt::from(operand))?, nsquare),
            Arithmetic::Diff => {
                paillier::subtract(current, &key.encrypt(&BigInt::from(operand))?, nsquare)?
            },
            Arithmetic::Mult => paillier::scalar_multiply(current, operand, nsquare)?,
        })
    }

    /// Adds every member. `Ok` when at least one member was new.
    ///
    /// # Errors
    /// * [`VeilError::InvalidInput`] when `members` is empty.
    /// * [`VeilError::Crypto`] or [`VeilError::Store`].
    #[instrument(level = "debug", skip_all, fields(count = members.len()))]
    pub async fn sadd(&self, key: &str, members: &[String]) -> Result<Status, VeilError> {
        if members.is_empty() {
            return Err(VeilError::InvalidInput {
                message: "at least one member is required".into(),
                context: Some("sadd".into()),
            });
        }
        let key = self.encrypt_key(key)?;
        let encrypted = members
            .iter()
            .map(|member| self.encrypt_set_member(member))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Status::from_added(self.inner.transport.sadd(&key, &encrypted).await?))
    }

    /// Members of the set at `key`, sorted. With `search`, only members matching it.
    ///
    /// Searchable members match when every word of `search` is one of their words.
    /// Enveloped members match when one of their words contains one of the search terms.
    ///
    /// # Errors
    /// Security violations if a stored member fails verification.
    #[instrument(level = "debug", skip_all)]
    pub async fn smembers(&self, key: &str, search: Option<&str>) -> Result<Vec<String>, VeilError> {
        let search = search.filter(|s| !s.trim().is_empty());
        let result = async {
            let key = self.encrypt_key(key)?;
            let stored = self.inner.transport.smembers(&key).await?;

            let mut members = match (&self.inner.members, self.inner.scheme.members) {
                (None, MemberScheme::Searchable) => self.search_members(&stored, search)?,
                (codec, _) => {
                    let decoded = stored
                        .iter()
                        .map(|member| match codec {
                            Some(codec) => codec.decode(member),
                            None => Ok(member.clone()),
                        })
                        .collect::<Result<Vec<_>, VeilError>>()?;
                    decoded
                        .into_iter()
                        .filter(|m| search.is_none_or(|s| contains_term(m, s)))
                        .collect()
                },
            };
            members.sort_unstable();
            Ok::<_, VeilError>(members)
        };
        observe("smembers", result.await)
    }

    fn search_members(
        &self,
        stored: &[String],
        search: Option<&str>,
    ) -> Result<Vec<String>, VeilError> {
        let cipher = self.inner.keys.search();
        let term = search
            .map(|s| cipher.encrypt(&s.split_whitespace().collect::<Vec<_>>().join(" ")))
            .transpose()?;
        stored
            .iter()
            .filter(|member| term.as_deref().is_none_or(|term| cipher.search_all(term, member)))
            .map(|member| {
                cipher.decrypt(member).map_err(|source| VeilError::IntegrityViolation {
                    message: "searchable member failed to decrypt".into(),
                    context: Some(source.to_string().into()),
                })
            })
            .collect()
    }

    /// Removes every key from the store.
    ///
    /// # Errors
    /// [`VeilError::Unsupported`] on a cluster.
    #[instrument(level = "debug", skip_all)]
    pub async fn flush_all(&self) -> Result<(), VeilError> {
        if self.inner.transport.topology() == Topology::Cluster {
            return Err(VeilError::Unsupported {
                message: "FLUSHALL is not supported on a cluster".into(),
                context: None,
            });
        }
        Ok(self.inner.transport.flush_all().await?)
    }

    fn encrypt_key(&self, key: &str) -> Result<String, VeilError> {
        Ok(self.inner.keys.det().encrypt(key)?)
    }

    fn encode_value(&self, value: &str) -> Result<String, VeilError> {
        self.inner.values.as_ref().map_or_else(|| Ok(value.to_owned()), |codec| codec.encode(value))
    }

    fn decode_value(&self, stored: &str) -> Result<String, VeilError> {
        self.inner.values.as_ref().map_or_else(|| Ok(stored.to_owned()), |codec| codec.decode(stored))
    }

    /// Sorted-set members are opaque text; integer members never become `ADD` values.
    fn encode_member(&self, member: &str) -> Result<String, VeilError> {
        self.inner
            .values
            .as_ref()
            .map_or_else(|| Ok(member.to_owned()), |codec| codec.encode_opaque(member))
    }

    fn encrypt_set_member(&self, member: &str) -> Result<String, VeilError> {
        match &self.inner.members {
            Some(codec) => codec.encode_opaque(member),
            None => Ok(self.inner.keys.search().encrypt(member)?),
        }
    }

    fn encrypt_score(&self, score: i64) -> Result<f64, VeilError> {
        let score = match self.inner.scheme.scores {
            ScoreScheme::Ope => {
                self.inner.keys.ope().encrypt(score).map_err(|source| VeilError::InvalidInput {
                    message: source.to_string().into(),
                    context: Some("score".into()),
                })?
            },
            ScoreScheme::Plain => score,
        };
        exact_score(score)
    }

    fn decrypt_score(&self, score: f64) -> Result<i64, VeilError> {
        let score = integral_score(score)?;
        match self.inner.scheme.scores {
            ScoreScheme::Ope => self.inner.keys.ope().decrypt(score).map_err(|source| {
                VeilError::IntegrityViolation {
                    message: "stored score is not an OPE ciphertext".into(),
                    context: Some(source.to_string().into()),
                }
            }),
            ScoreScheme::Plain => Ok(score),
        }
    }

    /// Bounds outside the OPE domain are clamped to the matching infinity, which keeps
    /// the range semantics: nothing lies beyond the domain.
    fn encrypt_bound(&self, bound: &str) -> Result<ScoreBound, VeilError> {
        let bound = bound.trim();
        match bound {
            "-inf" => return Ok(ScoreBound::NegInf),
            "inf" | "+inf" => return Ok(ScoreBound::PosInf),
            _ => {},
        }
        let value: i64 = bound.parse().map_err(|_| VeilError::InvalidInput {
            message: Cow::Owned(format!("range bound `{bound}` is not an integer")),
            context: Some("zrangebyscore".into()),
        })?;

        if self.inner.scheme.scores == ScoreScheme::Ope {
            if value < MIN_PLAINTEXT {
                return Ok(ScoreBound::NegInf);
            }
            if value > MAX_PLAINTEXT {
                return Ok(ScoreBound::PosInf);
            }
        } else if value.unsigned_abs() > EXACT_SCORE_LIMIT.unsigned_abs() {
            return Ok(if value < 0 { ScoreBound::NegInf } else { ScoreBound::PosInf });
        }
        Ok(ScoreBound::Value(self.encrypt_score(value)?))
    }
}

/// Logs a detected security violation before handing the result back.
fn observe<R>(op: &'static str, result: Result<R, VeilError>) -> Result<R, VeilError> {
    if let Err(err) = &result
        && err.is_security_violation()
    {
        error!(op, kind = err.kind(), "Security violation detected");
    }
    result
}

#[allow(clippy::cast_precision_loss)]
fn exact_score(score: i64) -> Result<f64, VeilError> {
    if score.unsigned_abs() > EXACT_SCORE_LIMIT.unsigned_abs() {
        return Err(VeilError::InvalidInput {
            message: "score is too large to store exactly".into(),
            context: Some("score".into()),
        });
    }
    Ok(score as f64)
}

#[allow(clippy::cast_possible_truncation)]
fn integral_score(score: f64) -> Result<i64, VeilError> {
    #[allow(clippy::cast_precision_loss)]
    let limit = EXACT_SCORE_LIMIT as f64;
    if !score.is_finite() || score.fract() != 0.0 || score.abs() > limit {
        return Err(VeilError::integrity("stored score is not an exact integer"));
    }
    Ok(score as i64)
}

/// Some word of `member` contains some whitespace-separated term of `search`.
fn contains_term(member: &str, search: &str) -> bool {
    let terms: Vec<&str> = search.split_whitespace().collect();
    member.split(' ').any(|word| terms.iter().any(|term| word.contains(term)))
}
