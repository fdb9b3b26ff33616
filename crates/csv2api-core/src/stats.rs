//! Run statistics tracking for reconciliation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::outcome::{OutcomeKind, RecordOutcome};

/// Latency and duration value reported when nothing was timed.
pub const UNSET: i64 = -1;

/// Aggregate counters for one run.
///
/// Serialized field names form the report shape: `min`, `max` and
/// `duration` are milliseconds, with `-1` when no timed call succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub attempts: u64,
    pub created: u64,
    pub updated: u64,
    pub replaced: u64,
    pub exists: u64,
    pub not_exists: u64,
    pub skipped: u64,
    pub errors: u64,
    pub unknowns: u64,
    pub dry_run: u64,
    #[serde(rename = "min")]
    pub min_latency_ms: i64,
    #[serde(rename = "max")]
    pub max_latency_ms: i64,
    #[serde(rename = "duration")]
    pub duration_ms: i64,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self {
            attempts: 0,
            created: 0,
            updated: 0,
            replaced: 0,
            exists: 0,
            not_exists: 0,
            skipped: 0,
            errors: 0,
            unknowns: 0,
            dry_run: 0,
            min_latency_ms: UNSET,
            max_latency_ms: UNSET,
            duration_ms: UNSET,
        }
    }
}

impl RunStatistics {
    /// Sum of every terminal outcome counter except dry runs.
    #[must_use]
    pub fn terminal_total(&self) -> u64 {
        self.created
            + self.updated
            + self.replaced
            + self.exists
            + self.not_exists
            + self.skipped
            + self.errors
            + self.unknowns
    }

    /// Every admitted record reached exactly one terminal counter.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.attempts == self.terminal_total() + self.dry_run
    }
}

/// Thread-safe tracker for accumulating statistics during a run.
#[derive(Debug)]
pub struct StatisticsTracker {
    attempts: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    replaced: AtomicU64,
    exists: AtomicU64,
    not_exists: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
    unknowns: AtomicU64,
    dry_run: AtomicU64,
    /// `u64::MAX` until the first timed success.
    min_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
    timed: AtomicU64,
    start_time: Instant,
}

impl Default for StatisticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            created: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
            exists: AtomicU64::new(0),
            not_exists: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            unknowns: AtomicU64::new(0),
            dry_run: AtomicU64::new(0),
            min_latency_ms: AtomicU64::new(u64::MAX),
            max_latency_ms: AtomicU64::new(0),
            timed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Folds one terminal outcome. Latency only counts for successes.
    pub fn record_outcome(&self, outcome: &RecordOutcome) {
        self.counter(outcome.kind).fetch_add(1, Ordering::SeqCst);

        if let (true, Some(latency)) = (outcome.kind.is_success(), outcome.latency) {
            self.record_latency(latency);
        }
    }

    fn record_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX - 1);
        self.min_latency_ms.fetch_min(millis, Ordering::SeqCst);
        self.max_latency_ms.fetch_max(millis, Ordering::SeqCst);
        self.timed.fetch_add(1, Ordering::SeqCst);
    }

    fn counter(&self, kind: OutcomeKind) -> &AtomicU64 {
        match kind {
            OutcomeKind::Created => &self.created,
            OutcomeKind::Updated => &self.updated,
            OutcomeKind::Replaced => &self.replaced,
            OutcomeKind::SkippedInvalid => &self.skipped,
            OutcomeKind::ExistsConflict => &self.exists,
            OutcomeKind::NotFoundConflict => &self.not_exists,
            OutcomeKind::RemoteError => &self.errors,
            OutcomeKind::UnknownStatus => &self.unknowns,
            OutcomeKind::DryRun => &self.dry_run,
        }
    }

    /// Snapshot of the current counters with the elapsed time so far.
    #[must_use]
    pub fn snapshot(&self) -> RunStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::SeqCst);
        let timed = load(&self.timed) > 0;
        let latency = |counter: &AtomicU64| {
            if timed {
                i64::try_from(load(counter)).unwrap_or(i64::MAX)
            } else {
                UNSET
            }
        };

        RunStatistics {
            attempts: load(&self.attempts),
            created: load(&self.created),
            updated: load(&self.updated),
            replaced: load(&self.replaced),
            exists: load(&self.exists),
            not_exists: load(&self.not_exists),
            skipped: load(&self.skipped),
            errors: load(&self.errors),
            unknowns: load(&self.unknowns),
            dry_run: load(&self.dry_run),
            min_latency_ms: latency(&self.min_latency_ms),
            max_latency_ms: latency(&self.max_latency_ms),
            duration_ms: i64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(i64::MAX),
        }
    }
}
