//! # Domain Models
//!
//! Pure data shared by the veil crates, with `serde` as the only dependency.
//! No I/O, networking or cryptography lives here.

pub mod config;
pub mod reply;
pub mod scheme;

pub use reply::{NIL, ScoredMember, Status};
pub use scheme::{MemberScheme, SchemeConfig, ScoreScheme, ValueScheme};
