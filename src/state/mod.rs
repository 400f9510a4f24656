//! State module for tracking crawl session progress
//!
//! # Components
//!
//! - `SessionState`: Phase of the per-route state machine (init, form filled, searched, etc.)
//! - `StepKind`/`StepResult`/`StepStatus`: Per-step outcomes returned by site adapters
//! - `StepPolicy`/`FailureKind`/`StepFailure`: Failure classification and promotion rules
//! - `AttemptOutcome`/`CrawlAttempt`: Per-attempt outcomes consumed by the retry orchestrator

mod attempt;
mod session_state;
mod step;

// Re-export main types
pub use attempt::{AttemptOutcome, CrawlAttempt};
pub use session_state::SessionState;
pub use step::{FailureKind, StepFailure, StepKind, StepPolicy, StepResult, StepStatus};
