//! Match results

use std::fmt;
use std::time::Duration;

use npubvanity_crypto::{decode_npub, decode_nsec, KeyEncoder, KeyError, NostrKeyEncoder};
use serde::{Deserialize, Serialize};

/// A keypair whose public identifier satisfied the session's pattern.
///
/// Immutable once the coordinator has recorded it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Encoded public identifier (`npub1...`)
    pub npub: String,
    /// Encoded private identifier (`nsec1...`)
    pub nsec: String,
    #[serde(with = "hex")]
    pub public_key: [u8; 32],
    #[serde(with = "hex")]
    pub private_key: [u8; 32],
    /// Zero-based arrival position within the session
    pub index: usize,
    /// Worker that found the match
    pub worker_id: usize,
    /// Session time at which the match was recorded
    pub elapsed: Duration,
}

impl MatchResult {
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }

    /// Recompute every encoded and derived form with `encoder` and compare
    pub fn verify_with(&self, encoder: &dyn KeyEncoder) -> Result<bool, KeyError> {
        Ok(encoder.derive_public(&self.private_key)? == self.public_key
            && encoder.encode_public(&self.public_key)? == self.npub
            && encoder.encode_private(&self.private_key)? == self.nsec)
    }

    /// Verify a Nostr result, including a decode of both identifiers
    pub fn verify(&self) -> Result<bool, KeyError> {
        Ok(self.verify_with(&NostrKeyEncoder)?
            && decode_npub(&self.npub)? == self.public_key
            && decode_nsec(&self.nsec)? == self.private_key)
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("npub", &self.npub)
            .field("index", &self.index)
            .field("worker_id", &self.worker_id)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}
