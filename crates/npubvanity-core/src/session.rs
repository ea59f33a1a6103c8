//! Search sessions: the aggregator that records progress and results, and
//! the handle callers use to observe and stop it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use npubvanity_crypto::KeyEncoder;
use npubvanity_pattern::Pattern;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::events::{MatchEvent, ProgressEvent, SessionEvent, WorkerEvent};
use crate::request::SearchRequest;
use crate::result::MatchResult;
use crate::stats::{SearchStats, StatsSnapshot};
use crate::worker::{CancelToken, SearchWorker};

/// Lifecycle of a search session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session has been started
    Idle,
    Running,
    /// The target number of matches was collected
    Completed,
    /// Stopped by the caller
    Cancelled,
    /// A worker hit a fatal error
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Cancelled => write!(f, "cancelled"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable session state, guarded by one lock.
///
/// Only the aggregator records progress and results. `Running` can be left
/// by the aggregator (completion, failure) or by `stop` (cancellation);
/// whichever takes the lock first wins.
struct Book {
    state: SessionState,
    stats: SearchStats,
    results: Vec<MatchResult>,
    failure: Option<SearchError>,
}

struct Shared {
    book: Mutex<Book>,
    cancel: CancelToken,
    events: Sender<SessionEvent>,
    request: SearchRequest,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live events never block the session; a full channel drops them
    fn emit(&self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(SessionEvent::Progress(_))) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event channel full, event dropped");
            }
        }
    }

    /// Cancel a running session. Returns `false` if it was not running.
    fn stop(&self) -> bool {
        let mut book = self.lock();
        if book.state != SessionState::Running {
            return false;
        }
        book.state = SessionState::Cancelled;
        book.stats.finish();
        self.cancel.cancel();
        self.emit(SessionEvent::StateChanged(SessionState::Cancelled));
        info!(
            pattern = %self.request.pattern,
            checked = book.stats.total_checked(),
            "search session cancelled"
        );
        true
    }
}

/// Sole writer of progress and results
struct Aggregator {
    shared: Arc<Shared>,
    worker_events: Receiver<WorkerEvent>,
}

impl Aggregator {
    /// Apply worker events until every worker has exited
    fn run(self) {
        for event in self.worker_events.iter() {
            self.apply(event);
        }

        let mut book = self.shared.lock();
        if book.state == SessionState::Running {
            // Every worker left without a stop signal
            warn!("all workers exited while the session was running");
            book.state = SessionState::Cancelled;
            book.stats.finish();
            self.shared.cancel.cancel();
            self.shared
                .emit(SessionEvent::StateChanged(SessionState::Cancelled));
        }
        debug!(state = %book.state, "session aggregator finished");
    }

    fn apply(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress {
                worker_id,
                checked,
                most_recent,
            } => {
                let mut book = self.shared.lock();
                if book.state != SessionState::Running {
                    debug!(worker_id, checked, "progress after session end discarded");
                    return;
                }
                book.stats.record_batch(checked, most_recent.clone());
                self.shared.emit(SessionEvent::Progress(ProgressEvent {
                    checked_delta: checked,
                    most_recent_npub: most_recent,
                    total_checked: book.stats.total_checked(),
                    keys_per_second: book.stats.keys_per_second(),
                }));
            }
            WorkerEvent::Found {
                worker_id,
                keypair,
                npub,
                nsec,
            } => {
                let mut book = self.shared.lock();
                if book.state != SessionState::Running {
                    debug!(worker_id, "match after session end discarded");
                    return;
                }

                let result = MatchResult {
                    npub,
                    nsec,
                    public_key: keypair.public_key,
                    private_key: keypair.private_key,
                    index: book.results.len(),
                    worker_id,
                    elapsed: book.stats.elapsed(),
                };
                book.results.push(result.clone());
                book.stats.record_match();
                info!(
                    worker_id,
                    npub = %result.npub,
                    found = book.results.len(),
                    target = self.shared.request.target_matches,
                    "match found"
                );
                self.shared.emit(SessionEvent::Match(MatchEvent { result }));

                if book.results.len() >= self.shared.request.target_matches {
                    book.state = SessionState::Completed;
                    book.stats.finish();
                    self.shared.cancel.cancel();
                    self.shared
                        .emit(SessionEvent::StateChanged(SessionState::Completed));
                    info!(
                        checked = book.stats.total_checked(),
                        elapsed_ms = book.stats.elapsed().as_millis() as u64,
                        "search session completed"
                    );
                }
            }
            WorkerEvent::Failed { worker_id, error } => {
                self.fail(SearchError::KeyGenerationFailure {
                    worker_id,
                    source: error,
                });
            }
            WorkerEvent::Panicked { worker_id } => {
                self.fail(SearchError::WorkerPanicked { worker_id });
            }
        }
    }

    /// First fatal error fails the whole session
    fn fail(&self, error: SearchError) {
        let mut book = self.shared.lock();
        if book.state != SessionState::Running {
            debug!(%error, "failure after session end discarded");
            return;
        }
        warn!(%error, "search session failed");
        book.state = SessionState::Failed;
        book.failure = Some(error.clone());
        book.stats.finish();
        self.shared.cancel.cancel();
        self.shared.emit(SessionEvent::Failed(error));
        self.shared
            .emit(SessionEvent::StateChanged(SessionState::Failed));
    }
}

struct SessionInner {
    shared: Arc<Shared>,
    events: Receiver<SessionEvent>,
    // Disconnects when the aggregator returns
    done: Receiver<()>,
    aggregator: Mutex<Option<JoinHandle<()>>>,
    // Worker threads live as long as the session
    _pool: rayon::ThreadPool,
}

impl SessionInner {
    fn join(&self) {
        let handle = self
            .aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shared.stop();
        self.join();
    }
}

/// Caller-side view of one running or finished session.
///
/// Clones share the same session. The session is cancelled and its threads
/// joined when the last clone is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.shared.lock().stats.snapshot()
    }

    /// Matches recorded so far, in arrival order
    pub fn results(&self) -> Vec<MatchResult> {
        self.inner.shared.lock().results.clone()
    }

    /// The error that failed the session, if any
    pub fn failure(&self) -> Option<SearchError> {
        self.inner.shared.lock().failure.clone()
    }

    pub fn request(&self) -> &SearchRequest {
        &self.inner.shared.request
    }

    /// Live feed of progress, matches and state changes
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.inner.events
    }

    /// Cancel the session. Calling this more than once has no further effect.
    pub fn stop(&self) {
        self.inner.shared.stop();
    }

    /// Whether every worker and the aggregator have exited
    pub fn is_finished(&self) -> bool {
        matches!(
            self.inner.done.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }

    /// Block until the session has ended and its threads are gone
    pub fn wait(&self) -> SessionState {
        let _ = self.inner.done.recv();
        self.inner.join();
        self.state()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SessionState> {
        match self.inner.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => None,
            _ => {
                self.inner.join();
                Some(self.state())
            }
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("request", self.request())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Spawn the aggregator and `request.workers` workers for a validated request
pub(crate) fn launch(
    request: SearchRequest,
    pattern: Pattern,
    config: &SearchConfig,
    encoder: Arc<dyn KeyEncoder>,
) -> Result<SessionHandle, SearchError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.workers)
        .thread_name(|i| format!("npub-worker-{}", i))
        .build()
        .map_err(|e| SearchError::ThreadPool(e.to_string()))?;

    let (worker_tx, worker_rx) = bounded(config.effective_event_capacity());
    let (event_tx, event_rx) = bounded(config.effective_event_capacity());
    let (done_tx, done_rx) = bounded::<()>(0);

    let cancel = CancelToken::new();
    let shared = Arc::new(Shared {
        book: Mutex::new(Book {
            state: SessionState::Running,
            stats: SearchStats::new(),
            results: Vec::with_capacity(request.target_matches.min(64)),
            failure: None,
        }),
        cancel: cancel.clone(),
        events: event_tx,
        request,
    });

    let aggregator = Aggregator {
        shared: Arc::clone(&shared),
        worker_events: worker_rx,
    };
    let aggregator_handle = thread::Builder::new()
        .name("npub-coordinator".into())
        .spawn(move || {
            aggregator.run();
            drop(done_tx);
        })
        .map_err(|e| SearchError::ThreadPool(e.to_string()))?;

    shared.emit(SessionEvent::StateChanged(SessionState::Running));

    let pattern = Arc::new(pattern);
    let batch_size = config.effective_batch_size();
    for id in 0..shared.request.workers {
        let worker = SearchWorker {
            id,
            pattern: Arc::clone(&pattern),
            encoder: Arc::clone(&encoder),
            batch_size,
            target_matches: shared.request.target_matches,
            cancel: cancel.clone(),
            events: worker_tx.clone(),
        };
        pool.spawn(move || worker.run());
    }
    // The aggregator ends once the last worker drops its sender
    drop(worker_tx);

    Ok(SessionHandle {
        inner: Arc::new(SessionInner {
            shared,
            events: event_rx,
            done: done_rx,
            aggregator: Mutex::new(Some(aggregator_handle)),
            _pool: pool,
        }),
    })
}
