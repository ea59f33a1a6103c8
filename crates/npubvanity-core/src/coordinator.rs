//! Search coordinator

use std::sync::Arc;

use npubvanity_crypto::{KeyEncoder, NostrKeyEncoder};
use tracing::info;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::request::SearchRequest;
use crate::session::{launch, SessionHandle, SessionState};

/// Starts search sessions and keeps track of the current one.
///
/// At most one session is running per coordinator: starting a new one stops
/// the previous session first.
pub struct Coordinator {
    config: SearchConfig,
    encoder: Arc<dyn KeyEncoder>,
    current: Option<SessionHandle>,
}

impl Coordinator {
    /// Coordinator producing real Nostr keys
    pub fn new(config: SearchConfig) -> Self {
        Self::with_encoder(config, Arc::new(NostrKeyEncoder))
    }

    pub fn with_encoder(config: SearchConfig, encoder: Arc<dyn KeyEncoder>) -> Self {
        Self {
            config,
            encoder,
            current: None,
        }
    }

    /// Validate `request` and start a fresh session for it.
    ///
    /// An invalid request leaves the coordinator untouched.
    pub fn start(&mut self, request: SearchRequest) -> Result<SessionHandle, SearchError> {
        let pattern = request.validate()?;

        if let Some(previous) = self.current.take() {
            previous.stop();
        }

        info!(
            pattern = %pattern,
            target = request.target_matches,
            workers = request.workers,
            batch_size = self.config.effective_batch_size(),
            "starting search session"
        );
        let handle = launch(request, pattern, &self.config, Arc::clone(&self.encoder))?;
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Stop `handle`'s session; a no-op once it has ended
    pub fn stop(&self, handle: &SessionHandle) {
        handle.stop();
    }

    pub fn stop_current(&self) {
        if let Some(handle) = &self.current {
            handle.stop();
        }
    }

    /// State of the current session, `Idle` if none was started
    pub fn state(&self) -> SessionState {
        self.current
            .as_ref()
            .map_or(SessionState::Idle, SessionHandle::state)
    }

    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use npubvanity_pattern::{searchable_portion, MatchPolicy, PatternError};

    use crate::events::SessionEvent;
    use crate::testing::ScriptedEncoder;

    const DEADLINE: Duration = Duration::from_secs(60);

    fn small_batches() -> SearchConfig {
        SearchConfig {
            batch_size: 100,
            ..Default::default()
        }
    }

    fn scripted(encoder: ScriptedEncoder) -> Coordinator {
        Coordinator::with_encoder(small_batches(), Arc::new(encoder))
    }

    fn collect_states(handle: &SessionHandle) -> Vec<SessionState> {
        handle
            .events()
            .try_iter()
            .filter_map(|event| match event {
                SessionEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_real_prefix_search_completes() {
        let mut coordinator = Coordinator::new(small_batches());
        assert_eq!(coordinator.state(), SessionState::Idle);

        let request = SearchRequest::new("ac", MatchPolicy::Prefix)
            .with_target(1)
            .with_workers(4);
        let handle = coordinator.start(request).unwrap();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Completed));
        assert_eq!(coordinator.state(), SessionState::Completed);

        let results = handle.results();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.npub.starts_with("npub1ac"));
        assert_eq!(result.index, 0);
        assert!(result.verify().unwrap());

        let stats = handle.stats();
        assert_eq!(stats.matches_found, 1);
        assert!(stats.total_checked >= 1);

        assert_eq!(
            collect_states(&handle),
            vec![SessionState::Running, SessionState::Completed]
        );
    }

    #[test]
    fn test_real_contains_search_collects_target() {
        let mut coordinator = Coordinator::new(small_batches());
        let request = SearchRequest::new("zz", MatchPolicy::Contains)
            .with_target(3)
            .with_workers(4);
        let handle = coordinator.start(request).unwrap();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Completed));

        let results = handle.results();
        assert_eq!(results.len(), 3);
        let distinct: HashSet<_> = results.iter().map(|r| r.npub.clone()).collect();
        assert_eq!(distinct.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert!(searchable_portion(&result.npub).contains("zz"));
            assert!(result.verify().unwrap());
        }
    }

    #[test]
    fn test_invalid_requests_leave_coordinator_idle() {
        let mut coordinator = scripted(ScriptedEncoder::never_matching());

        let empty = coordinator.start(SearchRequest::new("", MatchPolicy::Prefix));
        assert_eq!(
            empty.unwrap_err(),
            SearchError::InvalidPattern(PatternError::Empty)
        );

        let excluded = coordinator.start(SearchRequest::new("ab", MatchPolicy::Prefix));
        assert_eq!(
            excluded.unwrap_err(),
            SearchError::InvalidPattern(PatternError::InvalidCharacter { ch: 'b', position: 1 })
        );

        let no_workers =
            coordinator.start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(0));
        assert_eq!(no_workers.unwrap_err(), SearchError::InvalidWorkerCount(0));

        let no_target =
            coordinator.start(SearchRequest::new("ac", MatchPolicy::Prefix).with_target(0));
        assert_eq!(no_target.unwrap_err(), SearchError::InvalidTargetCount(0));

        assert_eq!(coordinator.state(), SessionState::Idle);
        assert!(coordinator.current().is_none());
    }

    #[test]
    fn test_target_is_a_hard_stop() {
        // Every key matches, so all eight workers race past the target
        let mut coordinator = scripted(ScriptedEncoder::matching_every(1, "ac"));
        let request = SearchRequest::new("ac", MatchPolicy::Prefix)
            .with_target(5)
            .with_workers(8);
        let handle = coordinator.start(request).unwrap();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Completed));

        let results = handle.results();
        assert_eq!(results.len(), 5);
        let indices: Vec<_> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(handle.stats().matches_found, 5);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut coordinator = scripted(ScriptedEncoder::never_matching());
        let handle = coordinator
            .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(2))
            .unwrap();

        coordinator.stop(&handle);
        coordinator.stop(&handle);
        handle.stop();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Cancelled));
        assert!(handle.is_finished());

        let after_wait = handle.stats();
        std::thread::sleep(Duration::from_millis(20));
        let later = handle.stats();
        assert_eq!(after_wait.total_checked, later.total_checked);
        assert_eq!(after_wait.elapsed, later.elapsed);
        assert!(handle.results().is_empty());

        let states = collect_states(&handle);
        assert_eq!(
            states.iter().filter(|s| **s == SessionState::Cancelled).count(),
            1
        );
    }

    #[test]
    fn test_cancel_reaches_every_worker_within_a_batch() {
        let workers = 4;
        let batch_size = small_batches().effective_batch_size();
        let encoder = Arc::new(ScriptedEncoder::never_matching());
        let mut coordinator = Coordinator::with_encoder(small_batches(), encoder.clone());
        let handle = coordinator
            .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(workers))
            .unwrap();
        while handle.stats().total_checked < workers as u64 * batch_size {
            std::thread::yield_now();
        }

        // `stop` raises the cancel token before it returns
        handle.stop();
        let at_cancel = encoder.generated();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Cancelled));
        let extra = encoder.generated() - at_cancel;
        assert!(
            extra <= workers as u64 * batch_size,
            "{} keys generated after cancellation",
            extra
        );
    }

    #[test]
    fn test_encoder_failure_fails_session() {
        let mut coordinator = scripted(ScriptedEncoder::failing_after(250));
        let handle = coordinator
            .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(2))
            .unwrap();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Failed));
        assert!(matches!(
            handle.failure(),
            Some(SearchError::KeyGenerationFailure { .. })
        ));
        let failed = handle
            .events()
            .try_iter()
            .any(|event| matches!(event, SessionEvent::Failed(_)));
        assert!(failed);
    }

    #[test]
    fn test_worker_panic_fails_session() {
        let mut coordinator = scripted(ScriptedEncoder::panicking());
        let handle = coordinator
            .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(3))
            .unwrap();

        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Failed));
        assert!(matches!(
            handle.failure(),
            Some(SearchError::WorkerPanicked { .. })
        ));
    }

    #[test]
    fn test_restart_resets_stats() {
        let encoder = Arc::new(ScriptedEncoder::never_matching());
        let mut coordinator = Coordinator::with_encoder(small_batches(), encoder.clone());

        let first = coordinator
            .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(2))
            .unwrap();
        while first.stats().total_checked == 0 {
            std::thread::yield_now();
        }

        let second = coordinator
            .start(SearchRequest::new("zap", MatchPolicy::Suffix).with_workers(1))
            .unwrap();
        assert_eq!(first.wait_timeout(DEADLINE), Some(SessionState::Cancelled));
        assert_eq!(second.state(), SessionState::Running);
        assert!(second.stats().total_checked < encoder.generated());

        coordinator.stop_current();
        assert_eq!(second.wait_timeout(DEADLINE), Some(SessionState::Cancelled));
        assert_eq!(second.request().pattern, "zap");
    }

    #[test]
    fn test_progress_totals_are_monotonic() {
        let mut coordinator = scripted(ScriptedEncoder::matching_every(700, "ac"));
        let handle = coordinator
            .start(
                SearchRequest::new("ac", MatchPolicy::Prefix)
                    .with_target(3)
                    .with_workers(4),
            )
            .unwrap();
        assert_eq!(handle.wait_timeout(DEADLINE), Some(SessionState::Completed));

        let mut last = 0;
        let mut deltas = 0;
        for event in handle.events().try_iter() {
            if let SessionEvent::Progress(progress) = event {
                assert!(progress.total_checked >= last);
                assert_eq!(progress.total_checked, last + progress.checked_delta);
                last = progress.total_checked;
                deltas += progress.checked_delta;
            }
        }
        assert_eq!(deltas, handle.stats().total_checked);
    }

    #[test]
    fn test_dropping_handles_stops_session() {
        let encoder = Arc::new(ScriptedEncoder::never_matching());
        {
            let mut coordinator = Coordinator::with_encoder(small_batches(), encoder.clone());
            let handle = coordinator
                .start(SearchRequest::new("ac", MatchPolicy::Prefix).with_workers(2))
                .unwrap();
            assert_eq!(handle.state(), SessionState::Running);
        }

        // Drop joined the session, so generation has stopped
        let settled = encoder.generated();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(encoder.generated(), settled);
    }
}
