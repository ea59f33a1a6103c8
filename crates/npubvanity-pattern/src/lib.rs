//! npubvanity Pattern Matching Engine
//!
//! Match policies (prefix, suffix, contains) over the searchable portion of an
//! `npub` identifier, plus the advisory difficulty estimator.

mod matcher;
mod difficulty;

pub use matcher::{
    matches, sanitize_pattern, searchable_portion, MatchPolicy, Pattern, PatternError,
    ALPHABET_SIZE, BECH32_ALPHABET, NPUB_FORMAT_TAG, SEARCHABLE_LENGTH,
};
pub use difficulty::{
    estimate, expected_attempts, format_difficulty, probability_found, DifficultyEstimate,
    DifficultyTier, TimeBucket, KEYS_PER_SECOND_PER_WORKER,
};
