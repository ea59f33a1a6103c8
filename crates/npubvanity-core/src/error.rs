//! Search engine errors

use npubvanity_crypto::KeyError;
use npubvanity_pattern::PatternError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
    #[error("Invalid worker count {0} (must be at least 1)")]
    InvalidWorkerCount(usize),
    #[error("Invalid target match count {0} (must be at least 1)")]
    InvalidTargetCount(usize),
    #[error("Worker {worker_id} failed to generate a key: {source}")]
    KeyGenerationFailure { worker_id: usize, source: KeyError },
    #[error("Worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
    #[error("Failed to start worker threads: {0}")]
    ThreadPool(String),
}

impl SearchError {
    /// Whether the error was raised by request validation, before any worker started
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidPattern(_)
                | SearchError::InvalidWorkerCount(_)
                | SearchError::InvalidTargetCount(_)
        )
    }
}
