//! Engine tuning knobs

use serde::{Deserialize, Serialize};

/// Attempts per progress batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: u64 = 1000;

/// Upper bound on the batch size, which bounds shutdown latency
pub const MAX_BATCH_SIZE: u64 = 100_000;

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Attempts between progress reports and cancellation checks
    pub batch_size: u64,
    /// Capacity of the caller-facing event channel
    pub event_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            event_capacity: 1024,
        }
    }
}

impl SearchConfig {
    /// Batch size clamped to `1..=MAX_BATCH_SIZE`
    pub fn effective_batch_size(&self) -> u64 {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Event capacity, never zero
    pub fn effective_event_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}
