//! Live search statistics

use std::time::{Duration, Instant};

use npubvanity_pattern::probability_found;
use serde::{Deserialize, Serialize};

/// Aggregated statistics of one session.
///
/// Lives under the session lock. The aggregator adds worker deltas and
/// matches; `stop` only freezes the clock. Callers read a [`StatsSnapshot`].
#[derive(Debug, Clone)]
pub struct SearchStats {
    total_checked: u64,
    matches_found: usize,
    start_time: Instant,
    finished_after: Option<Duration>,
    most_recent_candidate: Option<String>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self {
            total_checked: 0,
            matches_found: 0,
            start_time: Instant::now(),
            finished_after: None,
            most_recent_candidate: None,
        }
    }

    /// Add a worker's progress delta
    pub fn record_batch(&mut self, checked: u64, most_recent: Option<String>) {
        self.total_checked = self.total_checked.saturating_add(checked);
        if most_recent.is_some() {
            self.most_recent_candidate = most_recent;
        }
    }

    pub fn record_match(&mut self) {
        self.matches_found += 1;
    }

    /// Freeze the elapsed time; later calls keep the first value
    pub fn finish(&mut self) {
        if self.finished_after.is_none() {
            self.finished_after = Some(self.start_time.elapsed());
        }
    }

    pub fn total_checked(&self) -> u64 {
        self.total_checked
    }

    pub fn matches_found(&self) -> usize {
        self.matches_found
    }

    pub fn elapsed(&self) -> Duration {
        self.finished_after
            .unwrap_or_else(|| self.start_time.elapsed())
    }

    /// Get keys per second
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_checked as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_checked: self.total_checked,
            matches_found: self.matches_found,
            elapsed: self.elapsed(),
            keys_per_second: self.keys_per_second(),
            most_recent_candidate: self.most_recent_candidate.clone(),
        }
    }
}

impl Default for SearchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a session's statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_checked: u64,
    pub matches_found: usize,
    pub elapsed: Duration,
    pub keys_per_second: f64,
    /// Public identifier of the latest reported candidate
    pub most_recent_candidate: Option<String>,
}

impl StatsSnapshot {
    /// Get formatted stats string
    pub fn format(&self, expected_attempts: f64) -> String {
        let keys = self.total_checked;
        let kps = self.keys_per_second;

        let prob = probability_found(keys, expected_attempts);

        // Time until the cumulative chance reaches 50%
        let remaining_for_50 = if prob < 0.5 && kps > 0.0 {
            let keys_needed = expected_attempts * std::f64::consts::LN_2 - keys as f64;
            keys_needed / kps
        } else {
            0.0
        };

        format!(
            "[{}][{} key/s][Total {}][Found {}][Prob {:.1}%][50% in {}]",
            format_clock(self.elapsed),
            format_keys(kps as u64),
            format_keys(keys),
            self.matches_found,
            prob * 100.0,
            format_duration(remaining_for_50)
        )
    }
}

/// Compact count with K/M/G/T suffixes
pub fn format_keys(keys: u64) -> String {
    if keys >= 1_000_000_000_000 {
        format!("{:.2}T", keys as f64 / 1e12)
    } else if keys >= 1_000_000_000 {
        format!("{:.2}G", keys as f64 / 1e9)
    } else if keys >= 1_000_000 {
        format!("{:.2}M", keys as f64 / 1e6)
    } else if keys >= 1000 {
        format!("{:.2}K", keys as f64 / 1e3)
    } else {
        format!("{}", keys)
    }
}

pub fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "now".to_string();
    }
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.0}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.0}m", seconds / 60.0)
    } else if seconds < 86400.0 {
        format!("{:.1}h", seconds / 3600.0)
    } else if seconds < 86400.0 * 365.0 {
        format!("{:.1}d", seconds / 86400.0)
    } else {
        format!("{:.1}y", seconds / (86400.0 * 365.0))
    }
}

/// Wall-clock style `m:ss`, or `h:mm:ss` past the hour
pub fn format_clock(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
