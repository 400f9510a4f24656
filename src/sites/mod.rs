//! Site adapters
//!
//! Each airline's booking UI is driven by one [`SiteAdapter`]: an ordered
//! list of named steps plus the locators and parsing rules to run them.
//! Adapters never raise; every step reports a [`StepResult`] and the crawl
//! session decides what happens next.

pub mod austrian;
mod common;
pub mod klm;
pub mod qatar;

pub use austrian::AustrianAdapter;
pub use common::{
    dismiss_consent, fill_autocomplete, open_site, read_required_text, wait_and_click,
};
pub use klm::KlmAdapter;
pub use qatar::QatarAdapter;

use crate::driver::{DriverSession, FingerprintProfile};
use crate::journal::EventLog;
use crate::model::{AirlineId, ExtractedOffer, Route};
use crate::state::{StepKind, StepPolicy, StepResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// A step in an adapter's fixed order, with its degradation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub kind: StepKind,
    pub policy: StepPolicy,
}

impl StepSpec {
    pub const fn tolerate(kind: StepKind) -> Self {
        Self {
            kind,
            policy: StepPolicy::Tolerate,
        }
    }

    pub const fn escalate(kind: StepKind) -> Self {
        Self {
            kind,
            policy: StepPolicy::Escalate,
        }
    }
}

/// Wait bounds and pacing for adapter steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTiming {
    /// Bound for ordinary element waits
    pub step_timeout: Duration,
    /// Bound for the result list after submitting a search
    pub results_timeout: Duration,
    /// Pause after interactions that trigger animations or async loads
    pub settle_delay: Duration,
    pub human_delay_min: Duration,
    pub human_delay_max: Duration,
    /// Upper bound on result cards scanned for a selectable offer
    pub max_result_cards: usize,
}

impl Default for StepTiming {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            human_delay_min: Duration::from_secs(3),
            human_delay_max: Duration::from_secs(15),
            max_result_cards: 10,
        }
    }
}

impl StepTiming {
    /// Timing with no pauses and short waits, for scripted pages
    pub fn immediate() -> Self {
        Self {
            step_timeout: Duration::from_millis(20),
            results_timeout: Duration::from_millis(20),
            settle_delay: Duration::ZERO,
            human_delay_min: Duration::ZERO,
            human_delay_max: Duration::ZERO,
            max_result_cards: 5,
        }
    }

    pub async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    /// Sleeps for a uniformly random duration in the human delay range
    pub async fn human_pause(&self) {
        let delay = self.human_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn human_delay(&self) -> Duration {
        let min = self.human_delay_min.as_millis() as u64;
        let max = self.human_delay_max.as_millis() as u64;
        if max <= min {
            return self.human_delay_min;
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

/// Everything a step may read or write during one session
///
/// Values found by earlier steps (selected card, price text, stop count) are
/// carried here for later steps of the same session.
pub struct StepContext<'a> {
    pub session: &'a dyn DriverSession,
    pub route: &'a Route,
    pub crawl_date: NaiveDate,
    pub timing: &'a StepTiming,
    pub journal: &'a dyn EventLog,
    /// 1-based index of the result card chosen by `SelectCheapestOffer`
    pub selected_card: Option<usize>,
    pub price_text: Option<String>,
    /// Intermediate stop count read from the result card
    pub stop_count: Option<usize>,
    /// Set by `ExtractOffer` on success
    pub offer: Option<ExtractedOffer>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        session: &'a dyn DriverSession,
        route: &'a Route,
        crawl_date: NaiveDate,
        timing: &'a StepTiming,
        journal: &'a dyn EventLog,
    ) -> Self {
        Self {
            session,
            route,
            crawl_date,
            timing,
            journal,
            selected_card: None,
            price_text: None,
            stop_count: None,
            offer: None,
        }
    }
}

/// Per-airline booking flow
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn airline(&self) -> AirlineId;

    /// Fingerprint profile the browser session is started with
    fn fingerprint(&self) -> FingerprintProfile;

    /// First page opened for `route`
    fn entry_url(&self, route: &Route) -> String;

    /// Steps in the order the session runs them
    fn steps(&self) -> &[StepSpec];

    /// Runs one step; steps not in [`SiteAdapter::steps`] report `Ok`
    async fn run_step(&self, step: StepKind, ctx: &mut StepContext<'_>) -> StepResult;
}

/// Returns the adapter for `airline`
pub fn adapter_for(airline: AirlineId) -> Arc<dyn SiteAdapter> {
    match airline {
        AirlineId::Klm => Arc::new(KlmAdapter::new()),
        AirlineId::QatarAirways => Arc::new(QatarAdapter::new()),
        AirlineId::AustrianAirlines => Arc::new(AustrianAdapter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_for_matches_airline() {
        for airline in AirlineId::all() {
            assert_eq!(adapter_for(airline).airline(), airline);
        }
    }

    #[test]
    fn test_every_adapter_ends_with_extraction() {
        for airline in AirlineId::all() {
            let adapter = adapter_for(airline);
            let steps = adapter.steps();
            assert_eq!(steps.first().map(|s| s.kind), Some(StepKind::OpenSite));
            assert_eq!(steps.last().map(|s| s.kind), Some(StepKind::ExtractOffer));
        }
    }

    #[test]
    fn test_step_order_never_moves_backwards() {
        for airline in AirlineId::all() {
            let adapter = adapter_for(airline);
            let mut state = crate::state::SessionState::Init;
            for spec in adapter.steps() {
                let next = spec.kind.completes();
                assert!(
                    state.can_transition_to(next),
                    "{}: {} -> {}",
                    airline,
                    state,
                    next
                );
                state = next;
            }
        }
    }

    #[test]
    fn test_human_delay_within_bounds() {
        let timing = StepTiming {
            human_delay_min: Duration::from_millis(10),
            human_delay_max: Duration::from_millis(20),
            ..StepTiming::immediate()
        };
        for _ in 0..50 {
            let delay = timing.human_delay();
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_human_delay_degenerate_range() {
        let timing = StepTiming::immediate();
        assert_eq!(timing.human_delay(), Duration::ZERO);
    }
}
