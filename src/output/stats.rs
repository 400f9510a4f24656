//! Batch statistics
//!
//! This module aggregates the route runs of one batch into per-airline and
//! overall figures and prints them to stdout.

use crate::crawler::RouteRun;
use crate::model::{AirlineId, Route};
use crate::state::AttemptOutcome;
use chrono::{DateTime, Local, NaiveDate};

/// Route runs for one airline
#[derive(Debug, Clone)]
pub struct AirlineReport {
    pub airline: AirlineId,
    pub runs: Vec<RouteRun>,
}

impl AirlineReport {
    pub fn new(airline: AirlineId) -> Self {
        Self {
            airline,
            runs: Vec::new(),
        }
    }

    pub fn route_count(&self) -> usize {
        self.runs.len()
    }

    /// Routes whose expected record delta was reached
    pub fn verified_routes(&self) -> usize {
        self.runs.iter().filter(|run| run.is_verified()).count()
    }

    pub fn attempt_count(&self) -> usize {
        self.runs.iter().map(|run| run.attempts.len()).sum()
    }

    /// Number of offers sessions reported as written
    pub fn offers_produced(&self) -> u64 {
        self.runs
            .iter()
            .flat_map(|run| run.attempts.iter())
            .map(|attempt| u64::from(attempt.offers_produced))
            .sum()
    }

    /// Attempts that ended with the given outcome
    pub fn count_outcome(&self, outcome: AttemptOutcome) -> usize {
        self.runs
            .iter()
            .flat_map(|run| run.attempts.iter())
            .filter(|attempt| attempt.outcome == outcome)
            .count()
    }

    /// Routes that stayed unverified after every attempt
    pub fn failed_routes(&self) -> Vec<&Route> {
        self.runs
            .iter()
            .filter(|run| !run.is_verified())
            .map(|run| &run.route)
            .collect()
    }
}

/// Summary of one scheduler run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub crawl_date: NaiveDate,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// SHA-256 of the configuration file, when loaded from disk
    pub config_hash: Option<String>,
    pub airlines: Vec<AirlineReport>,
}

impl BatchReport {
    pub fn new(crawl_date: NaiveDate) -> Self {
        Self {
            crawl_date,
            started_at: Local::now(),
            finished_at: None,
            config_hash: None,
            airlines: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    pub fn total_routes(&self) -> usize {
        self.airlines.iter().map(AirlineReport::route_count).sum()
    }

    pub fn verified_routes(&self) -> usize {
        self.airlines.iter().map(AirlineReport::verified_routes).sum()
    }

    pub fn total_attempts(&self) -> usize {
        self.airlines.iter().map(AirlineReport::attempt_count).sum()
    }

    pub fn total_offers(&self) -> u64 {
        self.airlines.iter().map(AirlineReport::offers_produced).sum()
    }

    /// Share of routes verified, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total_routes();
        if total == 0 {
            return 0.0;
        }
        (self.verified_routes() as f64 / total as f64) * 100.0
    }
}

/// Prints batch statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The finished batch report
pub fn print_statistics(report: &BatchReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Crawl date: {}", report.crawl_date.format("%d-%m-%Y"));
    println!("  Routes: {}", report.total_routes());
    println!("  Attempts: {}", report.total_attempts());
    println!("  Offers written: {}", report.total_offers());
    if let Some(seconds) = report.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!();

    println!("By Airline:");
    for airline in &report.airlines {
        println!(
            "  {}: {} / {} routes verified, {} attempts ({} success, {} partial, {} hard failures)",
            airline.airline,
            airline.verified_routes(),
            airline.route_count(),
            airline.attempt_count(),
            airline.count_outcome(AttemptOutcome::Success),
            airline.count_outcome(AttemptOutcome::PartialFailure),
            airline.count_outcome(AttemptOutcome::HardFailure),
        );
    }
    println!();

    let failed: Vec<_> = report
        .airlines
        .iter()
        .flat_map(|airline| {
            airline
                .failed_routes()
                .into_iter()
                .map(move |route| (airline.airline, route))
        })
        .collect();
    if !failed.is_empty() {
        println!("Unverified Routes ({}):", failed.len());
        for (airline, route) in failed {
            println!("  - {}: {}", airline, route);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} routes verified)",
        report.success_rate(),
        report.verified_routes(),
        report.total_routes()
    );
}
