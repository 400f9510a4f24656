//! Sequential route scheduling
//!
//! Airlines are processed one after another, and routes within an airline in
//! configured order. A route that stays unverified only produces a warning;
//! the batch always continues with the next route.

use super::retry::{RetryOrchestrator, RetryPolicy};
use super::session::AirlineContext;
use crate::model::{AirlineId, Route};
use crate::output::{AirlineReport, BatchReport};
use chrono::NaiveDate;

/// One airline's collaborators and its route list
#[derive(Clone)]
pub struct AirlineJob {
    pub context: AirlineContext,
    pub routes: Vec<Route>,
}

impl AirlineJob {
    pub fn airline(&self) -> AirlineId {
        self.context.adapter.airline()
    }
}

/// Runs every configured route through the retry orchestrator
pub struct RouteScheduler {
    jobs: Vec<AirlineJob>,
    policy: RetryPolicy,
    expected_new_records: u64,
}

impl RouteScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `policy` - Retry bound and backoff applied to every route
    /// * `expected_new_records` - Record delta that verifies a route
    pub fn new(policy: RetryPolicy, expected_new_records: u64) -> Self {
        Self {
            jobs: Vec::new(),
            policy,
            expected_new_records,
        }
    }

    /// Queues an airline's routes after the ones already queued
    pub fn add_job(&mut self, job: AirlineJob) {
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn route_count(&self) -> usize {
        self.jobs.iter().map(|job| job.routes.len()).sum()
    }

    /// Processes every queued route, strictly one at a time
    ///
    /// # Arguments
    ///
    /// * `crawl_date` - Date stamped on every output record
    ///
    /// # Returns
    ///
    /// Per-airline route runs; failures are reported, never raised
    pub async fn run(&self, crawl_date: NaiveDate) -> BatchReport {
        let mut report = BatchReport::new(crawl_date);

        tracing::info!(
            "Starting batch: {} airline(s), {} route(s)",
            self.job_count(),
            self.route_count()
        );

        for job in &self.jobs {
            report.airlines.push(self.run_job(job, crawl_date).await);
        }

        report.finish();

        let unverified = report.total_routes() - report.verified_routes();
        if unverified > 0 {
            tracing::warn!(
                "{} of {} route(s) finished without a verified record",
                unverified,
                report.total_routes()
            );
        } else {
            tracing::info!("All {} route(s) verified", report.total_routes());
        }

        report
    }

    async fn run_job(&self, job: &AirlineJob, crawl_date: NaiveDate) -> AirlineReport {
        let airline = job.airline();
        let journal = job.context.journal.as_ref();
        let orchestrator = RetryOrchestrator::new(job.context.clone(), self.policy);
        let mut airline_report = AirlineReport::new(airline);

        journal.info(&format!(
            "===== {}: crawling {} route(s) =====",
            airline,
            job.routes.len()
        ));

        for route in &job.routes {
            let run = orchestrator
                .run_with_verification(route, self.expected_new_records, crawl_date)
                .await;

            if !run.is_verified() {
                journal.error(
                    &format!(
                        "Route {} failed after {} attempt(s)",
                        route,
                        run.attempts.len()
                    ),
                    Some(&format!(
                        "{} of {} expected record(s) written",
                        run.new_records, run.expected
                    )),
                );
            }
            airline_report.runs.push(run);
        }

        journal.info(&format!(
            "===== {}: finished, {} / {} route(s) verified =====",
            airline,
            airline_report.verified_routes(),
            airline_report.route_count()
        ));

        airline_report
    }
}
