/// Attempt-level outcomes used by the retry orchestrator
use super::SessionState;
use crate::model::Route;
use std::fmt;

/// How a single session run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    /// Offer produced with every step Ok
    Success,
    /// Offer produced but at least one step was Degraded
    PartialFailure,
    /// Session aborted, no offer
    HardFailure,
}

impl AttemptOutcome {
    /// Derives the outcome from a session's final state
    pub fn from_session(final_state: SessionState, degraded_steps: usize) -> Self {
        match (final_state, degraded_steps) {
            (SessionState::Done, 0) => Self::Success,
            (SessionState::Done, _) => Self::PartialFailure,
            _ => Self::HardFailure,
        }
    }

    pub fn produced_offer(&self) -> bool {
        !matches!(self, Self::HardFailure)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial_failure"),
            Self::HardFailure => write!(f, "hard_failure"),
        }
    }
}

/// One full session run for a route within a retry sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlAttempt {
    pub route: Route,
    /// 1-based
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub offers_produced: u32,
}

impl CrawlAttempt {
    pub fn new(route: Route, attempt_number: u32, outcome: AttemptOutcome) -> Self {
        let offers_produced = u32::from(outcome.produced_offer());
        Self {
            route,
            attempt_number,
            outcome,
            offers_produced,
        }
    }
}
