//! Search worker loop

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use npubvanity_crypto::{KeyEncoder, KeyError};
use npubvanity_pattern::Pattern;
use tracing::{debug, warn};

use crate::events::WorkerEvent;

/// Cooperative stop signal shared by a session and its workers
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a worker loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerExit {
    Cancelled,
    TargetReached,
    Disconnected,
}

/// One generate-and-check loop, run on its own thread.
///
/// All counters are private; the coordinator only ever sees reported deltas.
pub(crate) struct SearchWorker {
    pub(crate) id: usize,
    pub(crate) pattern: Arc<Pattern>,
    pub(crate) encoder: Arc<dyn KeyEncoder>,
    pub(crate) batch_size: u64,
    pub(crate) target_matches: usize,
    pub(crate) cancel: CancelToken,
    pub(crate) events: Sender<WorkerEvent>,
}

impl SearchWorker {
    /// Run until cancelled, disconnected, or failed.
    ///
    /// Encoder errors and panics are reported to the coordinator, never retried.
    pub(crate) fn run(self) {
        let worker_id = self.id;
        let events = self.events.clone();

        match panic::catch_unwind(AssertUnwindSafe(|| self.search())) {
            Ok(Ok(exit)) => debug!(worker_id, ?exit, "worker stopped"),
            Ok(Err(error)) => {
                warn!(worker_id, %error, "worker failed");
                let _ = events.send(WorkerEvent::Failed { worker_id, error });
            }
            Err(_) => {
                warn!(worker_id, "worker panicked");
                let _ = events.send(WorkerEvent::Panicked { worker_id });
            }
        }
    }

    fn search(&self) -> Result<WorkerExit, KeyError> {
        let mut found = 0usize;

        loop {
            let mut checked = 0u64;
            let mut most_recent: Option<String> = None;

            while checked < self.batch_size {
                let candidate = self.encoder.generate_keypair().and_then(|keypair| {
                    let npub = self.encoder.encode_public(&keypair.public_key)?;
                    Ok((keypair, npub))
                });
                let (keypair, npub) = match candidate {
                    Ok(candidate) => candidate,
                    Err(error) => {
                        self.flush(checked, most_recent);
                        return Err(error);
                    }
                };
                checked += 1;

                if self.pattern.matches(&npub) {
                    let nsec = match self.encoder.encode_private(&keypair.private_key) {
                        Ok(nsec) => nsec,
                        Err(error) => {
                            self.flush(checked, Some(npub));
                            return Err(error);
                        }
                    };
                    found += 1;

                    let event = WorkerEvent::Found {
                        worker_id: self.id,
                        keypair,
                        npub: npub.clone(),
                        nsec,
                    };
                    if self.events.send(event).is_err() {
                        return Ok(WorkerExit::Disconnected);
                    }

                    if found >= self.target_matches || self.cancel.is_cancelled() {
                        let exit = if found >= self.target_matches {
                            WorkerExit::TargetReached
                        } else {
                            WorkerExit::Cancelled
                        };
                        self.report(checked, Some(npub));
                        return Ok(exit);
                    }
                }

                most_recent = Some(npub);
            }

            if !self.report(checked, most_recent) {
                return Ok(WorkerExit::Disconnected);
            }
            if self.cancel.is_cancelled() {
                return Ok(WorkerExit::Cancelled);
            }
            thread::yield_now();
        }
    }

    /// Report a partial batch on the way out
    fn flush(&self, checked: u64, most_recent: Option<String>) {
        if checked > 0 {
            self.report(checked, most_recent);
        }
    }

    fn report(&self, checked: u64, most_recent: Option<String>) -> bool {
        self.events
            .send(WorkerEvent::Progress {
                worker_id: self.id,
                checked,
                most_recent,
            })
            .is_ok()
    }
}
