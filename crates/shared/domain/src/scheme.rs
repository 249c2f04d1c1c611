use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How string values (SET / GET and arithmetic targets) are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueScheme {
    /// Stored as given. Only keys are encrypted.
    Plain,
    /// Randomized AEAD, signed and hashed. 3-field wire form, no server-side arithmetic.
    Envelope,
    /// Integers become Paillier ciphertexts, everything else as `Envelope`. 4-field wire form.
    #[default]
    Homomorphic,
}

/// How set members are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberScheme {
    /// Word-level searchable encryption; SMEMBERS filters without decrypting.
    #[default]
    Searchable,
    /// Same envelope as values; SMEMBERS decrypts before filtering.
    Envelope,
}

/// How sorted-set scores are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreScheme {
    #[default]
    Ope,
    Plain,
}

/// The encryption scheme applied per data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    pub values: ValueScheme,
    pub members: MemberScheme,
    pub scores: ScoreScheme,
}

/// Error returned when a scheme name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScheme(pub String);

impl fmt::Display for UnknownScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scheme `{}`", self.0)
    }
}

impl std::error::Error for UnknownScheme {}

macro_rules! scheme_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownScheme;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(UnknownScheme(s.to_owned())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

scheme_names!(ValueScheme { Plain => "plain", Envelope => "envelope", Homomorphic => "homomorphic" });
scheme_names!(MemberScheme { Searchable => "searchable", Envelope => "envelope" });
scheme_names!(ScoreScheme { Ope => "ope", Plain => "plain" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let scheme = SchemeConfig::default();
        assert_eq!(scheme.values, ValueScheme::Homomorphic);
        assert_eq!(scheme.members, MemberScheme::Searchable);
        assert_eq!(scheme.scores, ScoreScheme::Ope);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Envelope".parse::<ValueScheme>().unwrap(), ValueScheme::Envelope);
        assert_eq!(" plain ".parse::<ScoreScheme>().unwrap(), ScoreScheme::Plain);
        assert!("rot13".parse::<MemberScheme>().is_err());
        assert_eq!(ValueScheme::Homomorphic.to_string(), "homomorphic");
    }
}
