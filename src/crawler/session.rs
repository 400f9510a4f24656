//! A single crawl session: one browser session, one route, at most one offer
//!
//! The session owns its driver session for its whole lifetime and closes it
//! on every exit path. Step results are folded through the adapter's
//! policies into the session state machine; a fatal step aborts the session
//! with no output.

use crate::config::DriverConfig;
use crate::driver::{Driver, DriverSession};
use crate::journal::EventLog;
use crate::model::{FlightOffer, Route};
use crate::output::ResultStore;
use crate::sites::{SiteAdapter, StepContext, StepTiming};
use crate::state::{AttemptOutcome, CrawlAttempt, SessionState};
use crate::HarvestError;
use chrono::NaiveDate;
use std::sync::Arc;

/// Per-airline collaborators shared by every session of that airline
#[derive(Clone)]
pub struct AirlineContext {
    pub adapter: Arc<dyn SiteAdapter>,
    pub driver: Arc<dyn Driver>,
    pub store: Arc<dyn ResultStore>,
    pub journal: Arc<dyn EventLog>,
    pub driver_config: DriverConfig,
    pub timing: StepTiming,
}

/// What one session run produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub final_state: SessionState,
    pub attempt: CrawlAttempt,
    /// The record appended to the result store, if any
    pub offer: Option<FlightOffer>,
    pub degraded_steps: usize,
}

/// How far the step loop got
struct Progress {
    state: SessionState,
    offer: Option<FlightOffer>,
    degraded_steps: usize,
}

impl Progress {
    fn aborted(degraded_steps: usize) -> Self {
        Self {
            state: SessionState::Aborted,
            offer: None,
            degraded_steps,
        }
    }
}

/// Moves `state` to `next`, rejecting backward or post-terminal moves
fn advance(state: &mut SessionState, next: SessionState) -> crate::Result<()> {
    if !state.can_transition_to(next) {
        return Err(HarvestError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    *state = next;
    Ok(())
}

/// Runs one adapter flow for one route
pub struct CrawlSession {
    context: AirlineContext,
}

impl CrawlSession {
    pub fn new(context: AirlineContext) -> Self {
        Self { context }
    }

    /// Runs the session to a terminal state
    ///
    /// Never returns an error: driver failures, fatal steps and store
    /// failures all end in `Aborted` with a log trail.
    ///
    /// # Arguments
    ///
    /// * `route` - Route to search
    /// * `attempt_number` - 1-based attempt index within the retry sequence
    /// * `crawl_date` - Date stamped on the output record
    ///
    /// # Returns
    ///
    /// The final state, the attempt record and the offer written, if any
    pub async fn run(
        &self,
        route: &Route,
        attempt_number: u32,
        crawl_date: NaiveDate,
    ) -> SessionReport {
        let journal = self.context.journal.as_ref();
        let adapter = self.context.adapter.as_ref();

        journal.info(&format!(
            "Starting attempt {} for {}",
            attempt_number, route
        ));

        let session_config = self
            .context
            .driver_config
            .session_config(adapter.fingerprint());

        let progress = match self.context.driver.new_session(&session_config).await {
            Ok(mut session) => {
                let progress = self.drive(session.as_ref(), route, crawl_date).await;
                if let Err(e) = session.close().await {
                    journal.error("Failed to close browser session", Some(&e.to_string()));
                }
                progress
            }
            Err(e) => {
                journal.error("Failed to start browser session", Some(&e.to_string()));
                Progress::aborted(0)
            }
        };

        let outcome = AttemptOutcome::from_session(progress.state, progress.degraded_steps);
        tracing::debug!(
            airline = %adapter.airline(),
            route = %route,
            attempt = attempt_number,
            state = %progress.state,
            outcome = %outcome,
            "Session finished"
        );

        SessionReport {
            final_state: progress.state,
            attempt: CrawlAttempt::new(route.clone(), attempt_number, outcome),
            offer: progress.offer,
            degraded_steps: progress.degraded_steps,
        }
    }

    /// Runs every adapter step, then assembles and stores the offer
    async fn drive(
        &self,
        session: &dyn DriverSession,
        route: &Route,
        crawl_date: NaiveDate,
    ) -> Progress {
        let journal = self.context.journal.as_ref();
        let adapter = self.context.adapter.as_ref();

        let mut state = SessionState::Init;
        let mut degraded_steps = 0;
        let mut ctx = StepContext::new(session, route, crawl_date, &self.context.timing, journal);

        for spec in adapter.steps() {
            let result = adapter.run_step(spec.kind, &mut ctx).await;
            let status = spec.policy.apply(result.status);
            if status.is_fatal() {
                journal.error(
                    &format!("Step {} failed, aborting session", spec.kind),
                    Some(&result.detail),
                );
                return Progress::aborted(degraded_steps);
            }
            if status.is_degraded() {
                degraded_steps += 1;
                journal.error(
                    &format!("Step {} degraded, continuing", spec.kind),
                    Some(&result.detail),
                );
            }

            if let Err(e) = advance(&mut state, spec.kind.completes()) {
                journal.error("Invalid state transition", Some(&e.to_string()));
                return Progress::aborted(degraded_steps);
            }
        }

        let Some(extracted) = ctx.offer.take() else {
            journal.error("Extraction finished without an offer", None);
            return Progress::aborted(degraded_steps);
        };

        let offer = FlightOffer::assemble(adapter.airline(), crawl_date, route, extracted);
        if let Err(e) = offer.validate() {
            journal.error("Extracted offer rejected", Some(&e.to_string()));
            return Progress::aborted(degraded_steps);
        }

        if let Err(e) = advance(&mut state, SessionState::Done) {
            journal.error("Invalid state transition", Some(&e.to_string()));
            return Progress::aborted(degraded_steps);
        }

        if let Err(e) = self.context.store.append(&offer) {
            journal.error("Failed to write flight offer", Some(&e.to_string()));
            return Progress::aborted(degraded_steps);
        }
        journal.info(&format!(
            "Flight data saved: {} at {} (shown as '{}')",
            route,
            offer.price,
            ctx.price_text.as_deref().unwrap_or_default().trim()
        ));

        Progress {
            state,
            offer: Some(offer),
            degraded_steps,
        }
    }
}
