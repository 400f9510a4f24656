//! Crawler module for running booking-site sessions
//!
//! This module contains the crawl orchestration, including:
//! - A single session driving one adapter flow for one route
//! - Bounded retry with record-count verification
//! - Sequential scheduling across airlines and routes

mod retry;
mod scheduler;
mod session;

pub use retry::{RetryOrchestrator, RetryPolicy, RouteRun};
pub use scheduler::{AirlineJob, RouteScheduler};
pub use session::{AirlineContext, CrawlSession, SessionReport};

use crate::config::Config;
use crate::driver::Driver;
use crate::journal::CsvEventLog;
use crate::output::{BatchReport, CsvResultStore};
use crate::sites::adapter_for;
use chrono::NaiveDate;
use std::sync::Arc;

/// Builds a scheduler writing to the configured result and log files
///
/// Every airline gets its own result file and journal; the driver is shared.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `driver` - Browser automation backend
/// * `crawl_date` - Date the batch runs on, used for route expansion
///
/// # Returns
///
/// * `Ok(RouteScheduler)` - Scheduler with one job per configured airline
/// * `Err(HarvestError)` - Route expansion failed
pub fn build_scheduler(
    config: &Config,
    driver: Arc<dyn Driver>,
    crawl_date: NaiveDate,
) -> crate::Result<RouteScheduler> {
    let mut scheduler = RouteScheduler::new(
        config.crawler.retry_policy(),
        config.crawler.expected_new_records,
    );

    for (airline, routes) in config.route_plan(crawl_date)? {
        let context = AirlineContext {
            adapter: adapter_for(airline),
            driver: Arc::clone(&driver),
            store: Arc::new(CsvResultStore::for_airline(
                &config.output.results_dir,
                airline,
            )),
            journal: Arc::new(CsvEventLog::for_airline(&config.output.logs_dir, airline)),
            driver_config: config.driver.clone(),
            timing: config.crawler.step_timing(),
        };
        scheduler.add_job(AirlineJob { context, routes });
    }

    Ok(scheduler)
}

/// Runs a complete batch for the configured airlines
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `driver` - Browser automation backend
/// * `crawl_date` - Date the batch runs on
///
/// # Returns
///
/// * `Ok(BatchReport)` - Batch finished; individual routes may be unverified
/// * `Err(HarvestError)` - The batch could not be set up
pub async fn run_batch(
    config: &Config,
    driver: Arc<dyn Driver>,
    crawl_date: NaiveDate,
) -> crate::Result<BatchReport> {
    let scheduler = build_scheduler(config, driver, crawl_date)?;
    Ok(scheduler.run(crawl_date).await)
}
