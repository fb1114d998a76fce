//! Failure classification.
//!
//! Provider adapters fail with a typed [`ErrorKind`]; the classifier maps
//! each kind to the [`FailureClass`] that drives the dispatcher's decision:
//! retry the same provider, fail over to the next one, or abort the whole
//! dispatch. The mapping is a plain lookup table so new failure signals can
//! be added without touching dispatch logic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Typed failure kind returned by a provider adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or missing credentials (HTTP 401/403).
    Auth,
    /// Explicit rate-limit signal (HTTP 429).
    RateLimit,
    /// Provider reports it is over capacity (HTTP 5xx overload).
    Overloaded,
    /// The call exceeded its deadline.
    Timeout,
    /// A transport-level failure (DNS, connect, TLS, reset).
    Network,
    /// The request itself was rejected as malformed (HTTP 400).
    InvalidRequest,
    /// The caller aborted the call. Never recorded against the provider.
    Canceled,
    /// Anything the adapter could not identify.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Overloaded => "overloaded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What the dispatcher should do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Misconfiguration: abort the dispatch, no retry, no failover.
    Fatal,
    /// Capacity signal: skip retries, move to the next candidate now.
    Failover,
    /// Transient: retry the same provider within its budget.
    Retryable,
    /// Unrecognized: retried conservatively with a budget of exactly one.
    Unknown,
}

/// Table-driven mapping from [`ErrorKind`] to [`FailureClass`].
///
/// The default table follows the operational policy of the dispatch layer:
/// credential and request errors are fatal, capacity signals fail over
/// immediately, timeouts and network blips are worth retrying in place.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: HashMap<ErrorKind, FailureClass>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        let rules = HashMap::from([
            (ErrorKind::Auth, FailureClass::Fatal),
            (ErrorKind::InvalidRequest, FailureClass::Fatal),
            (ErrorKind::RateLimit, FailureClass::Failover),
            (ErrorKind::Overloaded, FailureClass::Failover),
            (ErrorKind::Timeout, FailureClass::Retryable),
            (ErrorKind::Network, FailureClass::Retryable),
        ]);
        Self { rules }
    }
}

impl ErrorClassifier {
    /// Creates a classifier with the default rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overrides a classification rule.
    pub fn with_rule(mut self, kind: ErrorKind, class: FailureClass) -> Self {
        self.rules.insert(kind, class);
        self
    }

    /// Classifies a failure kind. Kinds without a rule are [`FailureClass::Unknown`].
    pub fn classify(&self, kind: ErrorKind) -> FailureClass {
        self.rules
            .get(&kind)
            .copied()
            .unwrap_or(FailureClass::Unknown)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_table_classification() {
        let c = ErrorClassifier::new();
        assert_eq!(c.classify(ErrorKind::Auth), FailureClass::Fatal);
        assert_eq!(c.classify(ErrorKind::InvalidRequest), FailureClass::Fatal);
        assert_eq!(c.classify(ErrorKind::RateLimit), FailureClass::Failover);
        assert_eq!(c.classify(ErrorKind::Overloaded), FailureClass::Failover);
        assert_eq!(c.classify(ErrorKind::Timeout), FailureClass::Retryable);
        assert_eq!(c.classify(ErrorKind::Network), FailureClass::Retryable);
    }

    #[test]
    fn unrecognized_kind_is_unknown() {
        let c = ErrorClassifier::new();
        assert_eq!(c.classify(ErrorKind::Unknown), FailureClass::Unknown);
        // Canceled carries no rule either; the dispatcher short-circuits it
        // before classification ever matters.
        assert_eq!(c.classify(ErrorKind::Canceled), FailureClass::Unknown);
    }

    #[test]
    fn rules_can_be_extended_and_overridden() {
        let c = ErrorClassifier::new()
            .with_rule(ErrorKind::Unknown, FailureClass::Failover)
            .with_rule(ErrorKind::Timeout, FailureClass::Failover);
        assert_eq!(c.classify(ErrorKind::Unknown), FailureClass::Failover);
        assert_eq!(c.classify(ErrorKind::Timeout), FailureClass::Failover);
        // Untouched rules keep their defaults.
        assert_eq!(c.classify(ErrorKind::Auth), FailureClass::Fatal);
    }
}
