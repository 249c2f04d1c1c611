use serde::{Deserialize, Serialize};
use std::fmt;

/// Printed by front ends for an absent key.
pub const NIL: &str = "(nil)";

/// Outcome of a command that affects at most one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Nok,
}

impl Status {
    /// `Ok` when the store reports exactly one affected element.
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count == 1 { Self::Ok } else { Self::Nok }
    }

    /// `Ok` when at least one element was added.
    #[must_use]
    pub const fn from_added(count: u64) -> Self {
        if count > 0 { Self::Ok } else { Self::Nok }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Nok => "NOK",
        })
    }
}

/// A decrypted sorted-set entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: i64,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: i64) -> Self {
        Self { member: member.into(), score }
    }
}

impl fmt::Display for ScoredMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.member, self.score)
    }
}
