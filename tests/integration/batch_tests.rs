//! Retry and scheduling tests
//!
//! Sessions run against scripted pages; result files live in temp dirs.

use chrono::NaiveDate;
use fare_harvester::config::{parse_config, DriverConfig};
use fare_harvester::crawler::{
    build_scheduler, AirlineContext, AirlineJob, RetryOrchestrator, RetryPolicy, RouteScheduler,
};
use fare_harvester::driver::{FakeElement, ScriptedDriver};
use fare_harvester::journal::MemoryEventLog;
use fare_harvester::output::{CsvResultStore, MemoryResultStore, ResultStore};
use fare_harvester::sites::{adapter_for, qatar, StepTiming};
use fare_harvester::{AirlineId, AirportCode, AttemptOutcome, Route};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn crawl_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn route(destination: &str) -> Route {
    Route::new(
        AirportCode::new("DOH").unwrap(),
        AirportCode::new(destination).unwrap(),
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    )
}

fn no_wait_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Duration::ZERO,
    }
}

/// Qatar result page that always yields one nonstop offer
fn qatar_page() -> ScriptedDriver {
    use qatar::locators::*;

    let driver = ScriptedDriver::new();
    driver
        .set(&first_result(), FakeElement::new())
        .set(&departure_time(), FakeElement::with_text("08:05"))
        .set(&arrival_time(), FakeElement::with_text("13:10"))
        .set(
            &flight_type_and_duration(),
            FakeElement::with_text("Nonstop, 6h 05m"),
        )
        .set(&price(), FakeElement::with_text("EUR 612.40"));
    driver
}

fn context(
    airline: AirlineId,
    driver: &ScriptedDriver,
    store: Arc<dyn ResultStore>,
    journal: &Arc<MemoryEventLog>,
) -> AirlineContext {
    AirlineContext {
        adapter: adapter_for(airline),
        driver: Arc::new(driver.clone()),
        store,
        journal: journal.clone(),
        driver_config: DriverConfig::default(),
        timing: StepTiming::immediate(),
    }
}

#[tokio::test]
async fn test_retry_stops_at_max_attempts() {
    let driver = ScriptedDriver::new();
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &driver, store.clone(), &journal),
        no_wait_policy(3),
    );

    let run = orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;

    assert_eq!(run.attempts.len(), 3);
    assert!(run
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::HardFailure));
    assert_eq!(
        run.attempts.iter().map(|a| a.attempt_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(!run.is_verified());
    assert_eq!(driver.sessions_opened(), 3);
    assert_eq!(driver.sessions_closed(), 3);
    assert_eq!(store.record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_first_success_needs_no_retry() {
    let driver = qatar_page();
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &driver, store.clone(), &journal),
        no_wait_policy(3),
    );

    let run = orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;

    assert_eq!(run.attempts.len(), 1);
    assert_eq!(run.new_records, 1);
    assert!(run.is_verified());
    assert_eq!(driver.sessions_opened(), 1);
}

#[tokio::test]
async fn test_retry_recovers_after_failed_session() {
    let driver = qatar_page();
    driver.fail_next_sessions(1);
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &driver, store.clone(), &journal),
        no_wait_policy(3),
    );

    let run = orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;

    assert_eq!(run.attempts.len(), 2);
    assert_eq!(run.attempts[0].outcome, AttemptOutcome::HardFailure);
    assert_eq!(run.attempts[1].outcome, AttemptOutcome::Success);
    assert!(run.is_verified());
    assert_eq!(store.record_count().unwrap(), 1);
    assert!(journal.contains("retrying"));
}

#[tokio::test]
async fn test_delta_is_measured_against_existing_records() {
    let driver = qatar_page();
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &driver, store.clone(), &journal),
        no_wait_policy(2),
    );

    orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;
    let second = orchestrator
        .run_with_verification(&route("LHR"), 2, crawl_date())
        .await;

    // one offer per session, so two new records take both attempts
    assert_eq!(second.attempts.len(), 2);
    assert_eq!(second.new_records, 2);
    assert!(second.is_verified());
    assert_eq!(store.record_count().unwrap(), 3);
}

#[tokio::test]
async fn test_unreadable_baseline_never_counts_existing_records() {
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());

    let seeded = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &qatar_page(), store.clone(), &journal),
        no_wait_policy(1),
    );
    seeded
        .run_with_verification(&route("LHR"), 1, crawl_date())
        .await;
    assert_eq!(store.record_count().unwrap(), 1);

    let broken = ScriptedDriver::new();
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &broken, store.clone(), &journal),
        no_wait_policy(2),
    );
    store.fail_next_counts(1);

    let run = orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;

    assert_eq!(run.attempts.len(), 2);
    assert!(run
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::HardFailure));
    assert_eq!(run.new_records, 0);
    assert!(!run.is_verified());
    assert!(journal.contains("Failed to read result record count"));
}

#[tokio::test]
async fn test_baseline_is_reread_after_count_failures() {
    let driver = qatar_page();
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let orchestrator = RetryOrchestrator::new(
        context(AirlineId::QatarAirways, &driver, store.clone(), &journal),
        no_wait_policy(3),
    );
    // both reads before the first session fail
    store.fail_next_counts(2);

    let run = orchestrator
        .run_with_verification(&route("FRA"), 1, crawl_date())
        .await;

    assert_eq!(run.attempts.len(), 2);
    assert_eq!(run.new_records, 1);
    assert!(run.is_verified());
    assert_eq!(store.record_count().unwrap(), 2);
}

#[tokio::test]
async fn test_header_written_once_across_invocations() {
    let dir = TempDir::new().unwrap();
    let driver = qatar_page();
    let journal = Arc::new(MemoryEventLog::new());

    for destination in ["FRA", "LHR", "CDG"] {
        let store = Arc::new(CsvResultStore::for_airline(
            dir.path(),
            AirlineId::QatarAirways,
        ));
        let orchestrator = RetryOrchestrator::new(
            context(AirlineId::QatarAirways, &driver, store, &journal),
            no_wait_policy(3),
        );
        let run = orchestrator
            .run_with_verification(&route(destination), 1, crawl_date())
            .await;
        assert!(run.is_verified());
    }

    let content =
        std::fs::read_to_string(dir.path().join("results_QatarAirways.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("airline_name,crawling_date"));
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("airline_name")).count(),
        1
    );
    assert_eq!(
        lines[1],
        "QatarAirways,18-10-2026,DOH,FRA,19-10-2026,06:05,08:05,13:10,false,00:00,612.40"
    );
    assert!(lines[3].contains(",DOH,CDG,"));
}

#[tokio::test]
async fn test_scheduler_continues_after_failed_airline() {
    let broken = ScriptedDriver::new();
    let working = qatar_page();
    let klm_store = Arc::new(MemoryResultStore::new());
    let qatar_store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());

    let mut scheduler = RouteScheduler::new(no_wait_policy(2), 1);
    scheduler.add_job(AirlineJob {
        context: context(AirlineId::Klm, &broken, klm_store.clone(), &journal),
        routes: vec![route("AMS"), route("BER")],
    });
    scheduler.add_job(AirlineJob {
        context: context(AirlineId::QatarAirways, &working, qatar_store.clone(), &journal),
        routes: vec![route("FRA")],
    });

    let report = scheduler.run(crawl_date()).await;

    assert_eq!(report.airlines.len(), 2);
    assert_eq!(report.total_routes(), 3);
    assert_eq!(report.verified_routes(), 1);
    assert_eq!(report.total_attempts(), 5);
    assert_eq!(report.airlines[0].failed_routes().len(), 2);
    assert_eq!(qatar_store.record_count().unwrap(), 1);
    assert_eq!(klm_store.record_count().unwrap(), 0);
    assert!(journal.contains("failed after 2 attempt(s)"));
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn test_configured_batch_writes_per_airline_files() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");
    let logs = dir.path().join("logs");
    let toml = format!(
        r#"
[crawler]
max-attempts = 1
retry-backoff-secs = 0
step-timeout-secs = 1
results-timeout-secs = 1
settle-delay-ms = 0
human-delay-min-ms = 0
human-delay-max-ms = 0

[output]
results-dir = "{}"
logs-dir = "{}"
summary-path = "{}"

[[airline]]
name = "qatar-airways"
origin = "DOH"
destinations = ["FRA", "MUC"]
"#,
        results.display(),
        logs.display(),
        dir.path().join("summary.md").display()
    );
    let config = parse_config(&toml).unwrap();

    let scheduler = build_scheduler(&config, Arc::new(qatar_page()), crawl_date()).unwrap();
    assert_eq!(scheduler.route_count(), 2);

    let report = scheduler.run(crawl_date()).await;
    assert_eq!(report.verified_routes(), 2);

    let store = CsvResultStore::for_airline(&results, AirlineId::QatarAirways);
    assert_eq!(store.record_count().unwrap(), 2);

    let log = std::fs::read_to_string(logs.join("logging_QatarAirways.csv")).unwrap();
    assert!(log.starts_with("date,time,level,message,error"));
    assert!(log.contains("Flight data saved"));
}
