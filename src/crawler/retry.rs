//! Bounded re-runs of a route until the result store shows new records

use super::session::{AirlineContext, CrawlSession};
use crate::model::Route;
use crate::state::CrawlAttempt;
use chrono::NaiveDate;
use std::time::Duration;

/// Retry bound and pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sessions per route, first attempt included
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }
}

/// Attempt history for one route
#[derive(Debug, Clone)]
pub struct RouteRun {
    pub route: Route,
    pub attempts: Vec<CrawlAttempt>,
    /// Record count delta observed after the last attempt
    pub new_records: u64,
    pub expected: u64,
}

impl RouteRun {
    /// Whether the store grew by at least the expected number of records
    pub fn is_verified(&self) -> bool {
        self.new_records >= self.expected
    }
}

/// Re-runs sessions for a route until its output is verified
///
/// Verification reads the result store, not the session's own report, so a
/// session that claims success without a durable record is retried.
pub struct RetryOrchestrator {
    context: AirlineContext,
    session: CrawlSession,
    policy: RetryPolicy,
}

impl RetryOrchestrator {
    pub fn new(context: AirlineContext, policy: RetryPolicy) -> Self {
        Self {
            session: CrawlSession::new(context.clone()),
            context,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Current record count, or `None` if the store cannot be read
    fn count_records(&self) -> Option<u64> {
        match self.context.store.record_count() {
            Ok(count) => Some(count),
            Err(e) => {
                self.context
                    .journal
                    .error("Failed to read result record count", Some(&e.to_string()));
                None
            }
        }
    }

    /// Runs sessions for `route` until `expected` new records appear
    ///
    /// At most `max_attempts` sessions are run, with the backoff slept
    /// between consecutive attempts. Exhausting the bound is not an error;
    /// the returned run is simply unverified. If the baseline count cannot
    /// be read it is read again before the next attempt; until it is known,
    /// no attempt can verify the route.
    ///
    /// # Arguments
    ///
    /// * `route` - Route to crawl
    /// * `expected` - Record count delta that counts as done, normally 1
    /// * `crawl_date` - Date stamped on output records
    ///
    /// # Returns
    ///
    /// The full attempt history and the observed record delta
    pub async fn run_with_verification(
        &self,
        route: &Route,
        expected: u64,
        crawl_date: NaiveDate,
    ) -> RouteRun {
        let journal = self.context.journal.as_ref();
        let mut baseline = self.count_records();

        let mut attempts = Vec::new();
        let mut new_records = 0;

        for attempt_number in 1..=self.policy.max_attempts {
            if baseline.is_none() {
                baseline = self.count_records();
            }

            let report = self.session.run(route, attempt_number, crawl_date).await;
            attempts.push(report.attempt);

            // without a baseline the delta is unknown and counts as zero
            new_records = match (baseline, self.count_records()) {
                (Some(before), Some(after)) => after.saturating_sub(before),
                _ => 0,
            };

            if new_records >= expected {
                journal.info(&format!(
                    "Route {} verified after {} attempt(s)",
                    route, attempt_number
                ));
                break;
            }

            if attempt_number < self.policy.max_attempts {
                journal.error(
                    &format!(
                        "Attempt {} for {} produced {} of {} expected record(s), retrying",
                        attempt_number, route, new_records, expected
                    ),
                    None,
                );
                if !self.policy.backoff.is_zero() {
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }

        RouteRun {
            route: route.clone(),
            attempts,
            new_records,
            expected,
        }
    }
}
