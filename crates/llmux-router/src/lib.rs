//! Failover-routing dispatch layer for LLM completion calls.
//!
//! Routes each request across an ordered list of providers: the first
//! healthy candidate is tried with bounded retries and exponential backoff,
//! capacity signals fail over to the next candidate immediately, and a
//! provider that keeps failing sits out a fixed cooldown window. Every call
//! attempt is recorded for per-provider usage statistics.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use llmux_router::{Dispatcher, DispatchRequest, RouterConfig};
//!
//! let config = RouterConfig::from_toml_file("llmux.toml")?;
//! let dispatcher = Dispatcher::from_config(config);
//!
//! let result = dispatcher
//!     .dispatch(DispatchRequest::prompt("Summarize this release note."))
//!     .await?;
//! println!("{} answered: {}", result.provider, result.text);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod classify;
pub mod clock;
pub mod complexity;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod stats;

pub use backends::openai::OpenAiAdapter;
pub use backends::{ProviderAdapter, ProviderError};
pub use classify::{ErrorClassifier, ErrorKind, FailureClass};
pub use clock::{Clock, ManualClock, SystemClock};
pub use complexity::{ComplexityAnalyzer, ComplexityLevel, ComplexityReport};
pub use config::{ProviderConfig, ProviderKind, RouterConfig};
pub use dispatch::{
    backoff_delay, DispatchError, DispatchRequest, DispatchResult, Dispatcher,
};
pub use health::{HealthRegistry, HealthReport, HealthState};
pub use stats::{
    AttemptOutcome, CallAttempt, ComplexityCounts, ProviderStats, StatsRecorder, StatsSnapshot,
};
