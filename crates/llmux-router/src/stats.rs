//! Usage statistics.
//!
//! Every call attempt, success or failure, lands in a bounded ring buffer.
//! Snapshots are aggregated from that log on demand, so the per-provider
//! figures can never drift from what the log actually contains. The global
//! fallback counter is a separate atomic: a fallback is a dispatch-level
//! event, not an attribute of any single attempt.

use crate::classify::ErrorKind;
use crate::complexity::ComplexityLevel;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of a single provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum AttemptOutcome {
    /// The provider returned a completion.
    Success,
    /// The provider failed with the given kind.
    Failure {
        /// Typed failure kind from the adapter boundary.
        kind: ErrorKind,
    },
}

/// One provider call, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
    /// Provider that was called.
    pub provider: String,
    /// When the call started.
    pub timestamp: DateTime<Utc>,
    /// How long the call took to resolve.
    pub latency: Duration,
    /// Whether it succeeded, and how it failed if not.
    pub outcome: AttemptOutcome,
}

impl CallAttempt {
    /// Whether this attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }

    /// The failure kind, when this attempt failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.outcome {
            AttemptOutcome::Success => None,
            AttemptOutcome::Failure { kind } => Some(kind),
        }
    }
}

/// Aggregated counters for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    /// Total attempts against this provider in the log.
    pub calls: u64,
    /// Attempts that returned a completion.
    pub successes: u64,
    /// Attempts that failed.
    pub failures: u64,
    /// `successes / calls`, or 0.0 when no calls were made.
    pub success_rate: f64,
}

/// How many requests scored into each complexity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityCounts {
    /// Requests scored [`ComplexityLevel::Low`].
    pub low: u64,
    /// Requests scored [`ComplexityLevel::Medium`].
    pub medium: u64,
    /// Requests scored [`ComplexityLevel::High`].
    pub high: u64,
}

/// A consistent view of usage, aggregated from the attempt log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Per-provider counters, keyed by provider name.
    pub providers: BTreeMap<String, ProviderStats>,
    /// Dispatches served (or finally failed) by a provider other than the
    /// first candidate attempted.
    pub total_fallbacks: u64,
    /// Total attempts across all providers in the log.
    pub total_calls: u64,
    /// Complexity tiers assigned by automatic scoring.
    pub complexity_detections: ComplexityCounts,
}

/// Append-only recorder of call attempts with bounded memory.
///
/// Safe for concurrent writers and readers; locks are short and never held
/// across provider calls.
pub struct StatsRecorder {
    log: RwLock<VecDeque<CallAttempt>>,
    capacity: usize,
    fallbacks: AtomicU64,
    complexity_low: AtomicU64,
    complexity_medium: AtomicU64,
    complexity_high: AtomicU64,
}

impl StatsRecorder {
    /// Creates a recorder that keeps at most `capacity` attempts.
    pub fn new(capacity: usize) -> Self {
        Self {
            log: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity: capacity.max(1),
            fallbacks: AtomicU64::new(0),
            complexity_low: AtomicU64::new(0),
            complexity_medium: AtomicU64::new(0),
            complexity_high: AtomicU64::new(0),
        }
    }

    /// Appends one attempt, evicting the oldest entry at capacity.
    pub fn record(&self, attempt: CallAttempt) {
        let mut log = self.log.write();
        if log.len() == self.capacity {
            log.pop_front();
        }
        log.push_back(attempt);
    }

    /// Counts one dispatch that ended on a provider other than its first
    /// attempted candidate.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one automatic complexity detection at the given tier.
    pub fn record_complexity(&self, level: ComplexityLevel) {
        let counter = match level {
            ComplexityLevel::Low => &self.complexity_low,
            ComplexityLevel::Medium => &self.complexity_medium,
            ComplexityLevel::High => &self.complexity_high,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Aggregates the current log into a consistent snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let log = self.log.read();
        let mut providers: BTreeMap<String, ProviderStats> = BTreeMap::new();
        for attempt in log.iter() {
            let entry = providers.entry(attempt.provider.clone()).or_default();
            entry.calls += 1;
            match attempt.outcome {
                AttemptOutcome::Success => entry.successes += 1,
                AttemptOutcome::Failure { .. } => entry.failures += 1,
            }
        }
        let total_calls = log.len() as u64;
        drop(log);

        for stats in providers.values_mut() {
            stats.success_rate = if stats.calls > 0 {
                stats.successes as f64 / stats.calls as f64
            } else {
                0.0
            };
        }

        StatsSnapshot {
            providers,
            total_fallbacks: self.fallbacks.load(Ordering::Relaxed),
            total_calls,
            complexity_detections: ComplexityCounts {
                low: self.complexity_low.load(Ordering::Relaxed),
                medium: self.complexity_medium.load(Ordering::Relaxed),
                high: self.complexity_high.load(Ordering::Relaxed),
            },
        }
    }

    /// The newest `n` failed attempts, newest first. Operator diagnosis aid.
    pub fn recent_failures(&self, n: usize) -> Vec<CallAttempt> {
        let log = self.log.read();
        log.iter()
            .rev()
            .filter(|a| !a.is_success())
            .take(n)
            .cloned()
            .collect()
    }
}
