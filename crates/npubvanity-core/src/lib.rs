//! npubvanity Core Engine
//!
//! Parallel search for Nostr keypairs whose `npub` matches a pattern:
//! workers generate and check candidates, a single coordinator thread owns
//! the session's statistics and results.

mod config;
mod coordinator;
mod error;
mod events;
mod request;
mod result;
mod session;
mod stats;
mod worker;

#[cfg(test)]
mod testing;

pub use config::{SearchConfig, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use coordinator::Coordinator;
pub use error::SearchError;
pub use events::{MatchEvent, ProgressEvent, SessionEvent};
pub use request::{default_worker_count, SearchRequest};
pub use result::MatchResult;
pub use session::{SessionHandle, SessionState};
pub use stats::{format_clock, format_duration, format_keys, SearchStats, StatsSnapshot};
pub use worker::CancelToken;

// Re-exports for convenience
pub use npubvanity_crypto::{
    decode_npub, decode_nsec, hex, KeyEncoder, KeyError, NostrKeyEncoder, RawKeypair,
};
pub use npubvanity_pattern::{
    estimate, expected_attempts, format_difficulty, probability_found, sanitize_pattern,
    DifficultyEstimate, DifficultyTier, MatchPolicy, Pattern, PatternError, TimeBucket,
};
