//! End-to-end session tests
//!
//! Each airline's adapter runs against a scripted page that mirrors the
//! site's markup closely enough for every locator to resolve.

use chrono::NaiveDate;
use fare_harvester::config::DriverConfig;
use fare_harvester::crawler::{AirlineContext, CrawlSession};
use fare_harvester::driver::{FakeElement, ScriptedDriver};
use fare_harvester::journal::MemoryEventLog;
use fare_harvester::output::{MemoryResultStore, ResultStore};
use fare_harvester::sites::{austrian, klm, qatar, adapter_for, StepTiming};
use fare_harvester::{AirlineId, AirportCode, AttemptOutcome, ClockDuration, Route, SessionState};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

fn crawl_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn route(origin: &str, destination: &str) -> Route {
    Route::new(
        AirportCode::new(origin).unwrap(),
        AirportCode::new(destination).unwrap(),
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    )
}

struct Harness {
    driver: ScriptedDriver,
    store: Arc<MemoryResultStore>,
    journal: Arc<MemoryEventLog>,
    session: CrawlSession,
}

fn harness(airline: AirlineId, driver: ScriptedDriver) -> Harness {
    let store = Arc::new(MemoryResultStore::new());
    let journal = Arc::new(MemoryEventLog::new());
    let context = AirlineContext {
        adapter: adapter_for(airline),
        driver: Arc::new(driver.clone()),
        store: store.clone(),
        journal: journal.clone(),
        driver_config: DriverConfig::default(),
        timing: StepTiming::immediate(),
    };
    Harness {
        driver,
        store,
        journal,
        session: CrawlSession::new(context),
    }
}

/// KLM page for a direct FRA - BER flight at 89,00 EUR
fn klm_page(route: &Route) -> ScriptedDriver {
    use klm::locators::*;

    let driver = ScriptedDriver::new();
    driver
        .set(&consent_button(), FakeElement::new().hides_on_click())
        .set(&trip_type_select(), FakeElement::new())
        .set(&one_way_option(), FakeElement::new())
        .set(&page_body(), FakeElement::new())
        .set(&origin_input(), FakeElement::new().commits_as("Frankfurt (FRA)"))
        .set(
            &destination_input(),
            FakeElement::new().commits_as("Berlin Brandenburg (BER)"),
        )
        .set(&date_picker_toggle(), FakeElement::new())
        .set(&calendar_day(route.date), FakeElement::new())
        .set(&calendar_confirm(), FakeElement::new().hides_on_click())
        .set(&search_button(), FakeElement::new())
        .set(&result_list(), FakeElement::new())
        .set(&result_filter(), FakeElement::new())
        .set(&result_filter_first_option(), FakeElement::new())
        .set(&economy_card(1), FakeElement::new())
        .set_all(
            &fare_tabs(),
            vec![FakeElement::new().hidden(), FakeElement::new()],
        )
        .set(&fare_tab_price(2), FakeElement::with_text("89,00 EUR"))
        .set(&details_button(1), FakeElement::new())
        .set(&total_duration(), FakeElement::with_text("1h 15min"))
        .set(&departure_time(), FakeElement::with_text("08:00"))
        .set(&arrival_time(), FakeElement::with_text("09:15"));
    driver
}

/// Austrian page for a two-stop itinerary
fn austrian_page(route: &Route) -> ScriptedDriver {
    use austrian::locators::*;

    let driver = ScriptedDriver::new();
    driver
        .set(&consent_button(), FakeElement::new().hides_on_click())
        .set(&origin_input(), FakeElement::new().commits_as("Wien (VIE)"))
        .set(
            &destination_input(),
            FakeElement::new().commits_as("New York John F. Kennedy (JFK)"),
        )
        .set(&round_trip_toggle(), FakeElement::new())
        .set(&one_way_option(), FakeElement::new())
        .set(&date_input(), FakeElement::new())
        .set(&calendar_day(route.date), FakeElement::new())
        .set(&calendar_continue(), FakeElement::new())
        .set(&search_button(), FakeElement::new())
        .set(&sort_menu(), FakeElement::new())
        .set(&sort_cheapest_option(), FakeElement::new())
        .set(&first_result_row(), FakeElement::new())
        .set(
            &stop_indicator(),
            FakeElement::new().attribute("class", "bound-nb-stop-container has-stops"),
        )
        .set(&travel_duration(), FakeElement::with_text("14h 35min"))
        .set(&departure_time(), FakeElement::with_text("06:45"))
        .set(&arrival_time(), FakeElement::with_text("15:20"))
        .set(&price(), FakeElement::with_text("1.234,56 €"))
        .set(&details_link(), FakeElement::new())
        .set(&stop_duration(1), FakeElement::with_text("3h 20min"))
        .set(&stop_duration(2), FakeElement::with_text("1h 50min"));
    driver
}

/// Qatar result page for a nonstop flight
fn qatar_page() -> ScriptedDriver {
    use qatar::locators::*;

    let driver = ScriptedDriver::new();
    driver
        .set(&first_result(), FakeElement::new())
        .set(&departure_time(), FakeElement::with_text("02:10"))
        .set(&arrival_time(), FakeElement::with_text("07:30 +1"))
        .set(
            &flight_type_and_duration(),
            FakeElement::with_text("Nonstop, 6h 20m"),
        )
        .set(&price(), FakeElement::with_text("EUR 1,049.00"));
    driver
}

#[tokio::test]
async fn test_klm_direct_flight_record() {
    let route = route("FRA", "BER");
    let h = harness(AirlineId::Klm, klm_page(&route));

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.attempt.outcome, AttemptOutcome::Success);

    let offer = report.offer.expect("offer written");
    assert_eq!(offer.airline, AirlineId::Klm);
    assert_eq!(offer.crawl_date, crawl_date());
    assert_eq!(offer.departure_time.format("%H:%M").to_string(), "08:00");
    assert_eq!(offer.arrival_time.format("%H:%M").to_string(), "09:15");
    assert_eq!(offer.travel_duration.to_string(), "01:15");
    assert!(!offer.has_transit);
    assert_eq!(offer.transit_duration, ClockDuration::ZERO);
    assert_eq!(offer.price, Decimal::from_str("89.00").unwrap());

    assert_eq!(h.store.record_count().unwrap(), 1);
    assert!(h.driver.was_clicked(&klm::locators::consent_button()));
    assert_eq!(h.driver.navigations(), vec![klm::locators::ENTRY_URL.to_string()]);
    assert_eq!(h.driver.sessions_closed(), 1);
}

#[tokio::test]
async fn test_klm_transfer_time_marks_transit() {
    let route = route("FRA", "BER");
    let driver = klm_page(&route);
    driver.set(
        &klm::locators::transfer_time(),
        FakeElement::with_text("Transferzeit: 1h 20min"),
    );
    let h = harness(AirlineId::Klm, driver);

    let offer = h.session.run(&route, 1, crawl_date()).await.offer.unwrap();

    assert!(offer.has_transit);
    assert_eq!(offer.transit_duration.to_string(), "01:20");
}

#[tokio::test]
async fn test_klm_field_refilled_after_revert() {
    let route = route("FRA", "BER");
    let driver = klm_page(&route);
    driver.set(
        &klm::locators::origin_input(),
        FakeElement::new()
            .commits_as("Frankfurt (FRA)")
            .reverts_first_fill(),
    );
    let h = harness(AirlineId::Klm, driver);

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Done);
    assert!(h.journal.contains("did not retain"));
}

#[tokio::test]
async fn test_klm_missing_price_aborts_without_record() {
    let route = route("FRA", "BER");
    let driver = klm_page(&route);
    driver.remove(&klm::locators::fare_tab_price(2));
    let h = harness(AirlineId::Klm, driver);

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Aborted);
    assert_eq!(report.attempt.outcome, AttemptOutcome::HardFailure);
    assert!(report.offer.is_none());
    assert_eq!(h.store.record_count().unwrap(), 0);
    assert_eq!(h.driver.sessions_closed(), 1);
}

#[tokio::test]
async fn test_klm_missing_filter_is_partial_failure() {
    let route = route("FRA", "BER");
    let driver = klm_page(&route);
    driver.remove(&klm::locators::result_filter());
    let h = harness(AirlineId::Klm, driver);

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.degraded_steps, 1);
    assert_eq!(report.attempt.outcome, AttemptOutcome::PartialFailure);
    assert_eq!(h.store.record_count().unwrap(), 1);
}

#[tokio::test]
async fn test_absent_consent_banner_still_succeeds() {
    let route = route("FRA", "BER");
    let driver = klm_page(&route);
    driver.remove(&klm::locators::consent_button());
    let h = harness(AirlineId::Klm, driver);

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.attempt.outcome, AttemptOutcome::Success);
    assert!(h.journal.contains("No consent prompt shown"));
}

#[tokio::test]
async fn test_austrian_two_stop_transit_is_summed() {
    let route = route("VIE", "JFK");
    let h = harness(AirlineId::AustrianAirlines, austrian_page(&route));

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Done);
    let offer = report.offer.expect("offer written");
    assert!(offer.has_transit);
    assert_eq!(offer.transit_duration.to_string(), "05:10");
    assert_eq!(offer.travel_duration.to_string(), "14:35");
    assert_eq!(offer.price, Decimal::from_str("1234.56").unwrap());
    assert!(h.driver.was_clicked(&austrian::locators::details_link()));
    assert!(h
        .journal
        .contains("at 1234.56 (shown as '1.234,56 €')"));
}

#[tokio::test]
async fn test_austrian_nonstop_skips_details() {
    let route = route("VIE", "JFK");
    let driver = austrian_page(&route);
    driver.set(
        &austrian::locators::stop_indicator(),
        FakeElement::new().attribute("class", "bound-nb-stop-container"),
    );
    let h = harness(AirlineId::AustrianAirlines, driver);

    let offer = h.session.run(&route, 1, crawl_date()).await.offer.unwrap();

    assert!(!offer.has_transit);
    assert_eq!(offer.transit_duration, ClockDuration::ZERO);
    assert!(!h.driver.was_clicked(&austrian::locators::details_link()));
}

#[tokio::test]
async fn test_austrian_unparsable_stop_duration_is_soft() {
    let route = route("VIE", "JFK");
    let driver = austrian_page(&route);
    driver.set(
        &austrian::locators::stop_duration(2),
        FakeElement::with_text("Umsteigezeit unbekannt"),
    );
    let h = harness(AirlineId::AustrianAirlines, driver);

    let offer = h.session.run(&route, 1, crawl_date()).await.offer.unwrap();

    assert_eq!(offer.transit_duration.to_string(), "03:20");
    assert!(h.journal.contains("Failed to extract time from string"));
}

#[tokio::test]
async fn test_qatar_nonstop_from_deep_link() {
    let route = route("DOH", "FRA");
    let h = harness(AirlineId::QatarAirways, qatar_page());

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Done);
    let offer = report.offer.expect("offer written");
    assert!(!offer.has_transit);
    assert_eq!(offer.travel_duration.to_string(), "06:20");
    assert_eq!(offer.arrival_time.format("%H:%M").to_string(), "07:30");
    assert_eq!(offer.price, Decimal::from_str("1049.00").unwrap());

    let navigations = h.driver.navigations();
    assert_eq!(navigations.len(), 1);
    assert!(navigations[0].contains("fromStation=DOH"));
    assert!(navigations[0].contains("toStation=FRA"));
    assert!(h.journal.contains("Cookie window did not open"));
}

#[tokio::test]
async fn test_qatar_layovers_from_details() {
    use qatar::locators::*;

    let route = route("FRA", "SYD");
    let driver = qatar_page();
    driver
        .set(
            &flight_type_and_duration(),
            FakeElement::with_text("1 Stopp, 22h 5m"),
        )
        .set(&details_link(), FakeElement::new())
        .set_all(
            &layover_durations(),
            vec![FakeElement::with_text("Aufenthalt 2h 40m")],
        );
    let h = harness(AirlineId::QatarAirways, driver);

    let offer = h.session.run(&route, 1, crawl_date()).await.offer.unwrap();

    assert!(offer.has_transit);
    assert_eq!(offer.transit_duration.to_string(), "02:40");
    assert_eq!(offer.travel_duration.to_string(), "22:05");
}

#[tokio::test]
async fn test_session_released_when_results_never_load() {
    let route = route("DOH", "FRA");
    let driver = qatar_page();
    driver.remove(&qatar::locators::first_result());
    let h = harness(AirlineId::QatarAirways, driver);

    let report = h.session.run(&route, 1, crawl_date()).await;

    assert_eq!(report.final_state, SessionState::Aborted);
    assert_eq!(h.driver.sessions_opened(), 1);
    assert_eq!(h.driver.sessions_closed(), 1);
    assert_eq!(h.store.record_count().unwrap(), 0);
}
