//! Search requests and their validation

use npubvanity_pattern::{MatchPolicy, Pattern};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Worker count used when the caller does not choose one
pub fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 8)
}

/// What to search for and how hard to search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw pattern text, lowercased during validation
    pub pattern: String,
    pub policy: MatchPolicy,
    /// Matches to collect before the session completes
    pub target_matches: usize,
    /// Number of parallel search workers
    pub workers: usize,
}

impl SearchRequest {
    /// One match, default worker count
    pub fn new(pattern: impl Into<String>, policy: MatchPolicy) -> Self {
        Self {
            pattern: pattern.into(),
            policy,
            target_matches: 1,
            workers: default_worker_count(),
        }
    }

    pub fn with_target(mut self, target_matches: usize) -> Self {
        self.target_matches = target_matches;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check every invariant and produce the compiled pattern
    pub fn validate(&self) -> Result<Pattern, SearchError> {
        let pattern = Pattern::new(&self.pattern, self.policy)?;

        if self.workers < 1 {
            return Err(SearchError::InvalidWorkerCount(self.workers));
        }
        if self.target_matches < 1 {
            return Err(SearchError::InvalidTargetCount(self.target_matches));
        }

        Ok(pattern)
    }
}
