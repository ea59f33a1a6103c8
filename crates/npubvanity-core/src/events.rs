//! Events exchanged between workers, the coordinator and the caller

use std::fmt;

use npubvanity_crypto::{KeyError, RawKeypair};
use serde::Serialize;

use crate::error::SearchError;
use crate::result::MatchResult;
use crate::session::SessionState;

/// Worker to coordinator messages
pub(crate) enum WorkerEvent {
    /// `checked` attempts finished since the previous report
    Progress {
        worker_id: usize,
        checked: u64,
        most_recent: Option<String>,
    },
    /// A candidate matched; carries everything needed for a [`MatchResult`]
    Found {
        worker_id: usize,
        keypair: RawKeypair,
        npub: String,
        nsec: String,
    },
    Failed {
        worker_id: usize,
        error: KeyError,
    },
    Panicked {
        worker_id: usize,
    },
}

impl fmt::Debug for WorkerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerEvent::Progress {
                worker_id,
                checked,
                most_recent,
            } => f
                .debug_struct("Progress")
                .field("worker_id", worker_id)
                .field("checked", checked)
                .field("most_recent", most_recent)
                .finish(),
            WorkerEvent::Found {
                worker_id,
                keypair,
                npub,
                ..
            } => f
                .debug_struct("Found")
                .field("worker_id", worker_id)
                .field("keypair", keypair)
                .field("npub", npub)
                .finish_non_exhaustive(),
            WorkerEvent::Failed { worker_id, error } => f
                .debug_struct("Failed")
                .field("worker_id", worker_id)
                .field("error", error)
                .finish(),
            WorkerEvent::Panicked { worker_id } => f
                .debug_struct("Panicked")
                .field("worker_id", worker_id)
                .finish(),
        }
    }
}

/// Progress delta forwarded to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub checked_delta: u64,
    /// Public identifier of the worker's latest candidate
    pub most_recent_npub: Option<String>,
    /// Session total after applying this delta
    pub total_checked: u64,
    pub keys_per_second: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    pub result: MatchResult,
}

/// Everything a caller can observe on [`crate::SessionHandle::events`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress(ProgressEvent),
    Match(MatchEvent),
    StateChanged(SessionState),
    Failed(SearchError),
}
