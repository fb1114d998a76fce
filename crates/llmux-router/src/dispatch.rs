//! Request dispatch with retry, backoff, and failover.
//!
//! The dispatcher walks the configured providers in priority order,
//! skipping any in cooldown, and issues calls through their adapters. A
//! failure is classified into retry / failover / fatal; transient failures
//! are retried on the same provider with exponential backoff until the
//! retry budget runs out, at which point the provider enters cooldown and
//! the next candidate is tried. The caller sees either the first success or
//! an error carrying the full attempt history.

use crate::backends::openai::OpenAiAdapter;
use crate::backends::{ProviderAdapter, ProviderError};
use crate::classify::{ErrorClassifier, ErrorKind, FailureClass};
use crate::clock::{Clock, SystemClock};
use crate::complexity::{ComplexityAnalyzer, ComplexityReport};
use crate::config::{ProviderConfig, RouterConfig};
use crate::health::{HealthRegistry, HealthReport};
use crate::stats::{AttemptOutcome, CallAttempt, StatsRecorder, StatsSnapshot};
use chrono::Utc;
use llmux_core::{LlmuxError, LlmuxResult, Message};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One logical completion request.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Correlation id carried through log events.
    pub id: Uuid,
    /// Conversation to complete.
    pub messages: Vec<Message>,
    /// Overrides the model every candidate would otherwise use.
    pub model_override: Option<String>,
    /// Overrides every candidate's configured per-call timeout.
    pub timeout_override: Option<Duration>,
}

impl DispatchRequest {
    /// Creates a request from a full message list.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages,
            model_override: None,
            timeout_override: None,
        }
    }

    /// Creates a request from a single user prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    /// Sets a model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Sets a timeout override.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }
}

/// A successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// Provider that ultimately served the request.
    pub provider: String,
    /// The completion text.
    pub text: String,
    /// Every attempt made for this dispatch, in order.
    pub attempts: Vec<CallAttempt>,
}

fn summarize_attempts(attempts: &[CallAttempt]) -> String {
    if attempts.is_empty() {
        return "no eligible provider (all in cooldown)".to_string();
    }
    attempts
        .iter()
        .map(|a| match a.error_kind() {
            Some(kind) => format!("{}: {kind}", a.provider),
            None => format!("{}: ok", a.provider),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A failed dispatch. Always carries the full attempt history so operators
/// can see which provider failed with what.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A fatal (misconfiguration-class) failure; no failover was attempted.
    #[error("fatal error from provider {provider}: {kind}: {message}")]
    Fatal {
        /// Provider that produced the fatal failure.
        provider: String,
        /// Typed failure kind.
        kind: ErrorKind,
        /// Provider-supplied detail.
        message: String,
        /// Attempts made before the dispatch aborted.
        attempts: Vec<CallAttempt>,
    },
    /// Every candidate failed or was in cooldown.
    #[error("all candidate providers exhausted: {summary}", summary = summarize_attempts(.attempts))]
    Exhausted {
        /// Attempts made across all candidates, in order.
        attempts: Vec<CallAttempt>,
    },
    /// The caller aborted the in-flight call.
    #[error("dispatch canceled by caller")]
    Canceled,
}

impl DispatchError {
    /// The attempt history behind this failure.
    pub fn attempts(&self) -> &[CallAttempt] {
        match self {
            DispatchError::Fatal { attempts, .. } | DispatchError::Exhausted { attempts } => {
                attempts
            }
            DispatchError::Canceled => &[],
        }
    }
}

/// Computes the exponential backoff delay for a retry attempt.
///
/// `base_ms * 2^attempt`, capped at `max_ms`. Pure so it can be tested
/// without a clock.
pub fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let ms = base_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(max_ms);
    Duration::from_millis(ms)
}

struct ProviderSlot {
    config: ProviderConfig,
    adapter: Arc<dyn ProviderAdapter>,
}

/// Routes completion requests across providers with failover.
///
/// Construct one at application startup and pass it by reference to every
/// call site; health state lives inside the value for the whole process and
/// is reset only through [`Dispatcher::reset_health`].
pub struct Dispatcher {
    providers: Vec<ProviderSlot>,
    classifier: ErrorClassifier,
    health: HealthRegistry,
    stats: StatsRecorder,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
    auto_complexity: bool,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Builds a dispatcher with an [`OpenAiAdapter`] per configured provider.
    pub fn from_config(config: RouterConfig) -> Self {
        let adapters = config
            .providers
            .iter()
            .map(|p| Arc::new(OpenAiAdapter::new(p.clone())) as Arc<dyn ProviderAdapter>)
            .collect();
        Self::build(config, adapters)
    }

    /// Builds a dispatcher with caller-supplied adapters, one per provider
    /// in configuration order.
    pub fn with_adapters(
        config: RouterConfig,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
    ) -> LlmuxResult<Self> {
        if adapters.len() != config.providers.len() {
            return Err(LlmuxError::Config(format!(
                "expected {} adapters, got {}",
                config.providers.len(),
                adapters.len()
            )));
        }
        Ok(Self::build(config, adapters))
    }

    fn build(config: RouterConfig, adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let health = HealthRegistry::new(
            config.providers.iter().map(|p| p.name.clone()),
            config.cooldown(),
        );
        let providers = config
            .providers
            .into_iter()
            .zip(adapters)
            .map(|(config, adapter)| ProviderSlot { config, adapter })
            .collect();
        Self {
            providers,
            classifier: ErrorClassifier::new(),
            health,
            stats: StatsRecorder::new(config.attempt_log_capacity),
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
            auto_complexity: config.auto_complexity_detection,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source. Intended for tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the failure classification table.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Dispatches one request, returning the first success or an error with
    /// the full attempt history.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchResult, DispatchError> {
        let report = (self.auto_complexity && request.model_override.is_none())
            .then(|| ComplexityAnalyzer::analyze(&request.messages));
        if let Some(r) = &report {
            self.stats.record_complexity(r.level);
            debug!(
                request_id = %request.id,
                level = ?r.level,
                score = r.score,
                estimated_tokens = r.estimated_tokens,
                "request complexity scored"
            );
        }

        // Candidate order is fixed for the whole dispatch: configured
        // priority, minus providers in cooldown at this instant.
        let now = self.clock.now();
        let candidates: Vec<&ProviderSlot> = self
            .providers
            .iter()
            .filter(|slot| self.health.is_available(&slot.config.name, now))
            .collect();

        let mut attempts: Vec<CallAttempt> = Vec::new();
        let mut first_candidate: Option<String> = None;

        for slot in candidates {
            let provider = slot.config.name.as_str();
            if first_candidate.is_none() {
                first_candidate = Some(provider.to_string());
            }
            let model = self.effective_model(slot, &request, report.as_ref());
            let timeout = request.timeout_override.unwrap_or_else(|| slot.config.timeout());

            let mut attempt: u32 = 0;
            loop {
                let started = Utc::now();
                let call_start = std::time::Instant::now();
                let outcome =
                    match tokio::time::timeout(timeout, slot.adapter.complete(&request.messages, model, timeout))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::new(
                            ErrorKind::Timeout,
                            format!("call exceeded {}s deadline", timeout.as_secs()),
                        )),
                    };
                let latency = call_start.elapsed();

                match outcome {
                    Ok(text) => {
                        let record = CallAttempt {
                            provider: provider.to_string(),
                            timestamp: started,
                            latency,
                            outcome: AttemptOutcome::Success,
                        };
                        self.stats.record(record.clone());
                        attempts.push(record);
                        self.health.record_success(provider);
                        if first_candidate.as_deref() != Some(provider) {
                            self.stats.record_fallback();
                        }
                        info!(
                            request_id = %request.id,
                            provider,
                            model,
                            attempt,
                            latency_ms = latency.as_millis() as u64,
                            "dispatch succeeded"
                        );
                        return Ok(DispatchResult {
                            provider: provider.to_string(),
                            text,
                            attempts,
                        });
                    }
                    Err(err) => {
                        // Caller-initiated abort is not a provider failure:
                        // nothing is recorded and health is untouched.
                        if err.kind == ErrorKind::Canceled {
                            return Err(DispatchError::Canceled);
                        }

                        let record = CallAttempt {
                            provider: provider.to_string(),
                            timestamp: started,
                            latency,
                            outcome: AttemptOutcome::Failure { kind: err.kind },
                        };
                        self.stats.record(record.clone());
                        attempts.push(record);

                        match self.classifier.classify(err.kind) {
                            FailureClass::Fatal => {
                                warn!(
                                    request_id = %request.id,
                                    provider,
                                    error = %err,
                                    "fatal error, aborting dispatch"
                                );
                                if first_candidate.as_deref() != Some(provider) {
                                    self.stats.record_fallback();
                                }
                                return Err(DispatchError::Fatal {
                                    provider: provider.to_string(),
                                    kind: err.kind,
                                    message: err.message,
                                    attempts,
                                });
                            }
                            FailureClass::Failover => {
                                warn!(
                                    request_id = %request.id,
                                    provider,
                                    error = %err,
                                    "capacity signal, failing over"
                                );
                                self.health.mark_unhealthy(provider, err.kind, self.clock.now());
                                break;
                            }
                            class @ (FailureClass::Retryable | FailureClass::Unknown) => {
                                // max_retries bounds total attempts on the
                                // provider. Unrecognized failures get one
                                // conservative retry regardless of budget.
                                let allowed_attempts = if class == FailureClass::Unknown {
                                    2
                                } else {
                                    slot.config.max_retries.max(1)
                                };
                                if attempt + 1 < allowed_attempts {
                                    let delay = backoff_delay(
                                        self.backoff_base_ms,
                                        self.backoff_max_ms,
                                        attempt,
                                    );
                                    info!(
                                        request_id = %request.id,
                                        provider,
                                        attempt,
                                        delay_ms = delay.as_millis() as u64,
                                        error = %err,
                                        "transient error, backing off"
                                    );
                                    tokio::time::sleep(delay).await;
                                    attempt += 1;
                                } else {
                                    warn!(
                                        request_id = %request.id,
                                        provider,
                                        attempt,
                                        error = %err,
                                        "retry budget exhausted, failing over"
                                    );
                                    self.health.mark_unhealthy(
                                        provider,
                                        err.kind,
                                        self.clock.now(),
                                    );
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }

        if let (Some(first), Some(last)) = (first_candidate.as_deref(), attempts.last()) {
            if last.provider != first {
                self.stats.record_fallback();
            }
        }
        warn!(
            request_id = %request.id,
            attempts = attempts.len(),
            "all candidate providers exhausted"
        );
        Err(DispatchError::Exhausted { attempts })
    }

    fn effective_model<'a>(
        &self,
        slot: &'a ProviderSlot,
        request: &'a DispatchRequest,
        report: Option<&ComplexityReport>,
    ) -> &'a str {
        if let Some(model) = request.model_override.as_deref() {
            return model;
        }
        if let (Some(report), Some(reasoning)) = (report, slot.config.reasoning_model.as_deref()) {
            if report.recommends_reasoning() {
                return reasoning;
            }
        }
        &slot.config.model
    }

    /// Aggregated usage statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The newest `n` failed attempts, newest first.
    pub fn recent_failures(&self, n: usize) -> Vec<CallAttempt> {
        self.stats.recent_failures(n)
    }

    /// Health of every provider right now.
    pub fn health_report(&self) -> Vec<HealthReport> {
        self.health.report(self.clock.now())
    }

    /// Forces one provider (or all, when `None`) back to healthy.
    pub fn reset_health(&self, provider: Option<&str>) {
        self.health.reset(provider);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn backoff_computation() {
        assert_eq!(backoff_delay(500, 30_000, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 30_000, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 30_000, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(500, 30_000, 5), Duration::from_millis(16_000));
        assert_eq!(backoff_delay(500, 30_000, 6), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(500, 30_000, 63), Duration::from_millis(30_000));
        // Overflow-safe at absurd attempt counts.
        assert_eq!(backoff_delay(500, 30_000, 200), Duration::from_millis(30_000));
    }

    #[test]
    fn backoff_is_strictly_increasing_until_cap() {
        let mut last = Duration::ZERO;
        for attempt in 0..6 {
            let delay = backoff_delay(500, 30_000, attempt);
            assert!(delay > last, "attempt {attempt} did not increase");
            last = delay;
        }
    }

    #[test]
    fn request_builders() {
        let req = DispatchRequest::prompt("hi")
            .with_model("deepseek-reasoner")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.model_override.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(req.timeout_override, Some(Duration::from_secs(5)));
    }

    #[test]
    fn exhausted_error_lists_every_failure() {
        let attempts = vec![
            CallAttempt {
                provider: "a".into(),
                timestamp: Utc::now(),
                latency: Duration::from_millis(10),
                outcome: AttemptOutcome::Failure { kind: ErrorKind::RateLimit },
            },
            CallAttempt {
                provider: "b".into(),
                timestamp: Utc::now(),
                latency: Duration::from_millis(10),
                outcome: AttemptOutcome::Failure { kind: ErrorKind::Timeout },
            },
        ];
        let err = DispatchError::Exhausted { attempts };
        let msg = err.to_string();
        assert!(msg.contains("a: rate_limit"), "got: {msg}");
        assert!(msg.contains("b: timeout"), "got: {msg}");
        assert_eq!(err.attempts().len(), 2);
    }

    #[test]
    fn exhausted_error_with_no_attempts_mentions_cooldown() {
        let err = DispatchError::Exhausted { attempts: vec![] };
        assert!(err.to_string().contains("all in cooldown"));
    }
}
