//! Difficulty estimation for vanity patterns
//!
//! Advisory only: nothing here feeds back into the search itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matcher::{MatchPolicy, ALPHABET_SIZE, SEARCHABLE_LENGTH};

/// Assumed single-worker throughput used for time estimates
pub const KEYS_PER_SECOND_PER_WORKER: f64 = 3500.0;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3600.0;
const DAY: f64 = 86400.0;
const WEEK: f64 = 604800.0;

/// Expected number of attempts to collect `target_matches` matches.
///
/// For `Contains` every starting position is treated as an independent
/// chance, which is an approximation rather than the exact probability.
pub fn expected_attempts(pattern_len: usize, policy: MatchPolicy, target_matches: usize) -> f64 {
    let exponent = pattern_len.min(i32::MAX as usize) as i32;
    let per_match = (ALPHABET_SIZE as f64).powi(exponent);

    let per_match = match policy {
        MatchPolicy::Prefix | MatchPolicy::Suffix => per_match,
        MatchPolicy::Contains => {
            let positions = (SEARCHABLE_LENGTH as f64 - pattern_len as f64 + 1.0).max(1.0);
            per_match / positions
        }
    };

    per_match * target_matches as f64
}

/// Coarse human-readable duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeBucket {
    Instant,
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
    Days(u64),
    Weeks(u64),
}

impl TimeBucket {
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds < 1.0 {
            TimeBucket::Instant
        } else if seconds < MINUTE {
            TimeBucket::Seconds(seconds.round() as u64)
        } else if seconds < HOUR {
            TimeBucket::Minutes((seconds / MINUTE).round() as u64)
        } else if seconds < DAY {
            TimeBucket::Hours((seconds / HOUR).round() as u64)
        } else if seconds < WEEK {
            TimeBucket::Days((seconds / DAY).round() as u64)
        } else {
            TimeBucket::Weeks((seconds / WEEK).round() as u64)
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Instant => write!(f, "instant"),
            TimeBucket::Seconds(n) => write!(f, "{}s", n),
            TimeBucket::Minutes(n) => write!(f, "{}m", n),
            TimeBucket::Hours(n) => write!(f, "{}h", n),
            TimeBucket::Days(n) => write!(f, "{}d", n),
            TimeBucket::Weeks(n) => write!(f, "{}w+", n),
        }
    }
}

/// Difficulty label derived from pattern length alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl DifficultyTier {
    pub fn from_len(pattern_len: usize) -> Self {
        match pattern_len {
            0..=2 => DifficultyTier::Easy,
            3 => DifficultyTier::Medium,
            4 => DifficultyTier::Hard,
            _ => DifficultyTier::Extreme,
        }
    }

    /// Fill level for a difficulty gauge
    pub fn percentage(self) -> u8 {
        match self {
            DifficultyTier::Easy => 25,
            DifficultyTier::Medium => 50,
            DifficultyTier::Hard => 75,
            DifficultyTier::Extreme => 100,
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyTier::Easy => write!(f, "Easy"),
            DifficultyTier::Medium => write!(f, "Medium"),
            DifficultyTier::Hard => write!(f, "Hard"),
            DifficultyTier::Extreme => write!(f, "Extreme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyEstimate {
    pub expected_attempts: f64,
    pub estimated_seconds: f64,
    pub bucket: TimeBucket,
    pub tier: DifficultyTier,
    pub target_matches: usize,
}

/// Estimate how long a search would take with `workers` workers
pub fn estimate(
    pattern_len: usize,
    policy: MatchPolicy,
    target_matches: usize,
    workers: usize,
) -> DifficultyEstimate {
    let expected = expected_attempts(pattern_len, policy, target_matches);
    let keys_per_second = KEYS_PER_SECOND_PER_WORKER * workers.max(1) as f64;
    let seconds = expected / keys_per_second;

    DifficultyEstimate {
        expected_attempts: expected,
        estimated_seconds: seconds,
        bucket: TimeBucket::from_seconds(seconds),
        tier: DifficultyTier::from_len(pattern_len),
        target_matches,
    }
}

impl fmt::Display for DifficultyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = if self.target_matches == 1 { "result" } else { "results" };
        write!(
            f,
            "{}, ~{} for {} {}",
            self.tier, self.bucket, self.target_matches, results
        )
    }
}

/// Format difficulty as human-readable string
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.0}", difficulty)
    }
}

/// Chance that at least one match has turned up after `checked` attempts
pub fn probability_found(checked: u64, expected_attempts: f64) -> f64 {
    if expected_attempts > 0.0 {
        1.0 - (-(checked as f64) / expected_attempts).exp()
    } else {
        0.0
    }
}
