//! Per-provider health tracking.
//!
//! A provider is either `Healthy` or in `Cooldown` until a fixed deadline.
//! Expiry is lazy: there is no background timer, the deadline is compared
//! against the caller-supplied `now` whenever health is queried. Re-entering
//! cooldown while a window is active never extends it, which bounds the
//! worst-case blackout for a provider no matter how many failures land
//! during the window.

use crate::classify::ErrorKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Observable health state of a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Eligible for candidate selection.
    Healthy,
    /// Excluded from candidate selection until the deadline passes.
    Cooldown {
        /// When the provider becomes eligible again.
        until: Instant,
    },
}

#[derive(Debug, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    cooldown_until: Option<Instant>,
    last_error: Option<ErrorKind>,
}

/// Snapshot of one provider's health, for operator introspection.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Provider name.
    pub provider: String,
    /// Current state at the time of the query.
    pub state: HealthState,
    /// Failures since the last success or reset.
    pub consecutive_failures: u32,
    /// Kind of the most recent failure, if any.
    pub last_error: Option<ErrorKind>,
}

/// Tracks cooldown state for every configured provider.
///
/// All mutation happens under one mutex, so a concurrent
/// check-then-mark sequence converges on a single cooldown window.
pub struct HealthRegistry {
    cooldown: Duration,
    inner: Mutex<HashMap<String, ProviderHealth>>,
}

impl HealthRegistry {
    /// Creates a registry with every named provider starting `Healthy`.
    pub fn new(providers: impl IntoIterator<Item = String>, cooldown: Duration) -> Self {
        let inner = providers
            .into_iter()
            .map(|name| (name, ProviderHealth::default()))
            .collect();
        Self {
            cooldown,
            inner: Mutex::new(inner),
        }
    }

    /// Whether the provider may be used at `now`.
    ///
    /// An expired window is cleared as a side effect, so the transition back
    /// to `Healthy` needs no timer.
    pub fn is_available(&self, provider: &str, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        let Some(health) = inner.get_mut(provider) else {
            return false;
        };
        match health.cooldown_until {
            Some(until) if now < until => false,
            Some(_) => {
                info!(provider, "cooldown expired, provider eligible again");
                health.cooldown_until = None;
                health.consecutive_failures = 0;
                true
            }
            None => true,
        }
    }

    /// Current state of the provider at `now`, without clearing expiry.
    pub fn state(&self, provider: &str, now: Instant) -> HealthState {
        let inner = self.inner.lock();
        match inner.get(provider).and_then(|h| h.cooldown_until) {
            Some(until) if now < until => HealthState::Cooldown { until },
            _ => HealthState::Healthy,
        }
    }

    /// Marks a failure that takes the provider out of rotation.
    ///
    /// Starts a cooldown window of the fixed configured length unless one is
    /// already active; an active window is left untouched.
    pub fn mark_unhealthy(&self, provider: &str, kind: ErrorKind, now: Instant) {
        let mut inner = self.inner.lock();
        let Some(health) = inner.get_mut(provider) else {
            return;
        };
        health.consecutive_failures += 1;
        health.last_error = Some(kind);
        let active = matches!(health.cooldown_until, Some(until) if now < until);
        if !active {
            health.cooldown_until = Some(now + self.cooldown);
            info!(
                provider,
                error = %kind,
                cooldown_secs = self.cooldown.as_secs(),
                "provider entering cooldown"
            );
        } else {
            debug!(provider, error = %kind, "failure during active cooldown, window unchanged");
        }
    }

    /// Records a successful call, clearing the failure streak.
    pub fn record_success(&self, provider: &str) {
        let mut inner = self.inner.lock();
        if let Some(health) = inner.get_mut(provider) {
            health.consecutive_failures = 0;
            health.cooldown_until = None;
            health.last_error = None;
        }
    }

    /// Forces one provider (or all, when `None`) back to `Healthy`.
    pub fn reset(&self, provider: Option<&str>) {
        let mut inner = self.inner.lock();
        match provider {
            Some(name) => {
                if let Some(health) = inner.get_mut(name) {
                    *health = ProviderHealth::default();
                    info!(provider = name, "health reset");
                }
            }
            None => {
                for (name, health) in inner.iter_mut() {
                    *health = ProviderHealth::default();
                    debug!(provider = %name, "health reset");
                }
            }
        }
    }

    /// Reports the health of every tracked provider at `now`.
    pub fn report(&self, now: Instant) -> Vec<HealthReport> {
        let inner = self.inner.lock();
        let mut reports: Vec<HealthReport> = inner
            .iter()
            .map(|(name, health)| HealthReport {
                provider: name.clone(),
                state: match health.cooldown_until {
                    Some(until) if now < until => HealthState::Cooldown { until },
                    _ => HealthState::Healthy,
                },
                consecutive_failures: health.consecutive_failures,
                last_error: health.last_error,
            })
            .collect();
        reports.sort_by(|a, b| a.provider.cmp(&b.provider));
        reports
    }
}
