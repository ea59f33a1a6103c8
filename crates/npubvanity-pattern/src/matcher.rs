//! Pattern matching implementation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bech32 data alphabet (lowercase alphanumerics without 1, b, i, o)
pub const BECH32_ALPHABET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Number of symbols in [`BECH32_ALPHABET`]
pub const ALPHABET_SIZE: usize = 32;

/// Fixed tag every public identifier starts with
pub const NPUB_FORMAT_TAG: &str = "npub1";

/// Length of an `npub` after its format tag (52 data + 6 checksum symbols)
pub const SEARCHABLE_LENGTH: usize = 58;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Pattern contains invalid character '{ch}' at position {position} (valid: {})", BECH32_ALPHABET)]
    InvalidCharacter { ch: char, position: usize },
}

/// Where in the identifier the pattern must appear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Match right after the `npub1` tag
    #[default]
    Prefix,
    /// Match at the end of the identifier
    Suffix,
    /// Match anywhere after the tag
    Contains,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prefix" | "start" => Ok(MatchPolicy::Prefix),
            "suffix" | "end" => Ok(MatchPolicy::Suffix),
            "contains" | "anywhere" => Ok(MatchPolicy::Contains),
            _ => Err(format!("Unknown match policy: {}", s)),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Prefix => write!(f, "prefix"),
            MatchPolicy::Suffix => write!(f, "suffix"),
            MatchPolicy::Contains => write!(f, "contains"),
        }
    }
}

/// The part of an identifier patterns are matched against.
///
/// Identifiers lacking the `npub1` tag are returned whole.
#[inline]
pub fn searchable_portion(encoded_id: &str) -> &str {
    encoded_id.strip_prefix(NPUB_FORMAT_TAG).unwrap_or(encoded_id)
}

/// Check an encoded identifier against a normalized pattern
#[inline]
pub fn matches(encoded_id: &str, pattern: &str, policy: MatchPolicy) -> bool {
    let searchable = searchable_portion(encoded_id);
    match policy {
        MatchPolicy::Prefix => searchable.starts_with(pattern),
        MatchPolicy::Suffix => searchable.ends_with(pattern),
        MatchPolicy::Contains => searchable.contains(pattern),
    }
}

/// Lowercase the input and drop every character outside the alphabet
pub fn sanitize_pattern(raw: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| BECH32_ALPHABET.contains(*c))
        .collect()
}

/// A validated, lowercase pattern together with its policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPattern")]
pub struct Pattern {
    value: String,
    policy: MatchPolicy,
}

/// Unchecked wire form of [`Pattern`]
#[derive(Deserialize)]
struct RawPattern {
    value: String,
    #[serde(default)]
    policy: MatchPolicy,
}

impl TryFrom<RawPattern> for Pattern {
    type Error = PatternError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        Pattern::new(&raw.value, raw.policy)
    }
}

impl Pattern {
    /// Normalize `raw` to lowercase and validate it against the alphabet
    pub fn new(raw: &str, policy: MatchPolicy) -> Result<Self, PatternError> {
        let value = raw.to_ascii_lowercase();

        if value.is_empty() {
            return Err(PatternError::Empty);
        }

        if let Some((position, ch)) = value
            .chars()
            .enumerate()
            .find(|(_, c)| !BECH32_ALPHABET.contains(*c))
        {
            return Err(PatternError::InvalidCharacter { ch, position });
        }

        Ok(Self { value, policy })
    }

    /// Create a new prefix pattern
    pub fn prefix(raw: &str) -> Result<Self, PatternError> {
        Self::new(raw, MatchPolicy::Prefix)
    }

    /// Create a new suffix pattern
    pub fn suffix(raw: &str) -> Result<Self, PatternError> {
        Self::new(raw, MatchPolicy::Suffix)
    }

    /// Create a new contains pattern
    pub fn contains(raw: &str) -> Result<Self, PatternError> {
        Self::new(raw, MatchPolicy::Contains)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[inline]
    pub fn matches(&self, encoded_id: &str) -> bool {
        matches(encoded_id, &self.value, self.policy)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.policy)
    }
}
