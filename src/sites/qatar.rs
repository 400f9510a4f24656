//! Qatar Airways booking flow (deep-linked flight selection)
//!
//! The whole search is encoded in the entry URL, so there is no form to
//! fill. Results come back sorted by price; the first card is the cheapest.

use super::common::{open_site, read_required_text, required_clock_time, wait_and_click};
use super::{SiteAdapter, StepContext, StepSpec};
use crate::driver::FingerprintProfile;
use crate::model::{AirlineId, ExtractedOffer, Route};
use crate::parse::{parse_leg_duration, parse_price, ClockDuration, PriceLocale};
use crate::state::{StepFailure, StepKind, StepResult};
use async_trait::async_trait;
use url::Url;

/// Locators for the Qatar Airways flight selection page
pub mod locators {
    use crate::driver::Locator;

    pub const FLIGHT_SELECTION_URL: &str =
        "https://www.qatarairways.com/app/booking/flight-selection";

    const FIRST_RESULT: &str = r#"//*[@id="at-flight-search-result-1"]"#;

    const FIRST_CARD: &str = r#"//*[@id="at-flight-search-result-1"]/div/div/div[1]/booking-smart-flight-card/qr-flight-card/div"#;

    pub fn cookie_banner() -> Locator {
        Locator::css("#cookie-id > div.cookie-btn.col-md-12 > div")
    }

    pub fn cookie_accept() -> Locator {
        Locator::css("#cookie-accept-all")
    }

    pub fn first_result() -> Locator {
        Locator::xpath(FIRST_RESULT)
    }

    pub fn departure_time() -> Locator {
        Locator::xpath(format!("{}/div[2]/div[1]/h3", FIRST_CARD))
    }

    pub fn arrival_time() -> Locator {
        Locator::xpath(format!("{}/div[2]/div[3]/h3/span", FIRST_CARD))
    }

    /// Label such as `Nonstop, 1h 15m`
    pub fn flight_type_and_duration() -> Locator {
        Locator::xpath(format!("{}/div[2]/div[2]/p/div", FIRST_CARD))
    }

    pub fn price() -> Locator {
        Locator::xpath(format!("{}/div/div/div[3]/div/div[1]/a/div[2]/span", FIRST_RESULT))
    }

    pub fn details_link() -> Locator {
        Locator::xpath(format!("{}/div[3]/div/div", FIRST_CARD))
    }

    /// Layover paragraphs in the flight details modal
    pub fn layover_durations() -> Locator {
        Locator::xpath(
            "/html/body/modal/div[2]/div/div[1]/div[2]/booking-smart-flight-details/qr-flight-details/div/div[3]/p",
        )
    }
}

const STEPS: [StepSpec; 5] = [
    StepSpec::escalate(StepKind::OpenSite),
    StepSpec::tolerate(StepKind::DismissConsent),
    StepSpec::escalate(StepKind::SubmitSearch),
    StepSpec::escalate(StepKind::SelectCheapestOffer),
    StepSpec::escalate(StepKind::ExtractOffer),
];

/// Builds the flight selection deep link for `route`
///
/// One adult, economy, one way, sorted by price.
pub fn flight_selection_url(route: &Route) -> String {
    let departing = route.date.format("%Y-%m-%d").to_string();
    let params = [
        ("widget", "QR"),
        ("searchType", "F"),
        ("addTaxToFare", "Y"),
        ("upsellCallId", "100"),
        ("flexibleDate", "off"),
        ("bookingClass", "E"),
        ("tripType", "O"),
        ("selLang", "de"),
        ("fromStation", route.origin.as_str()),
        ("toStation", route.destination.as_str()),
        ("departing", departing.as_str()),
        ("adults", "1"),
        ("children", "0"),
        ("infants", "0"),
        ("teenager", "0"),
        ("ofw", "0"),
        ("allowRedemption", "N"),
        ("sort", "price"),
    ];

    Url::parse_with_params(locators::FLIGHT_SELECTION_URL, &params)
        .map(String::from)
        .unwrap_or_else(|_| locators::FLIGHT_SELECTION_URL.to_string())
}

/// Splits a `"<type>, <duration>"` label
fn split_type_and_duration(label: &str) -> (&str, &str) {
    match label.split_once(',') {
        Some((kind, duration)) => (kind.trim(), duration.trim()),
        None => (label.trim(), ""),
    }
}

fn is_nonstop(flight_type: &str) -> bool {
    let lower = flight_type.to_lowercase();
    lower.contains("nonstop") || lower.contains("direkt")
}

/// Adapter for qatarairways.com
#[derive(Debug, Clone, Default)]
pub struct QatarAdapter;

impl QatarAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Scrolls to trigger the cookie banner and accepts it if it shows up
    async fn dismiss_consent(&self, ctx: &StepContext<'_>) -> StepResult {
        let step = StepKind::DismissConsent;
        if let Err(e) = ctx.session.scroll_by(300).await {
            return StepFailure::from(e).into_result(step);
        }
        ctx.timing.settle().await;

        match ctx
            .session
            .wait_for(&locators::cookie_banner(), ctx.timing.step_timeout)
            .await
        {
            Ok(_) => match wait_and_click(ctx, &locators::cookie_accept()).await {
                Ok(_) => {
                    ctx.journal.info("Cookies accepted");
                    StepResult::ok(step)
                }
                Err(failure) => {
                    ctx.journal
                        .error("Failed to accept cookies", Some(&failure.message));
                    StepFailure::soft_ui(failure.message).into_result(step)
                }
            },
            Err(e) if e.is_timeout() => {
                ctx.journal
                    .info("Cookie window did not open, no accepting needed");
                StepResult::ok_with(step, "consent prompt absent")
            }
            Err(e) => StepFailure::from(e).into_result(step),
        }
    }

    async fn wait_for_results(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        ctx.session
            .wait_for(&locators::first_result(), ctx.timing.results_timeout)
            .await?;
        ctx.journal.info("Flight results loaded");
        Ok(())
    }

    async fn select_cheapest(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        ctx.session
            .wait_for(&locators::first_result(), ctx.timing.step_timeout)
            .await
            .map_err(|e| StepFailure::extraction(format!("no result card: {}", e)))?;
        ctx.selected_card = Some(1);
        Ok(())
    }

    /// Opens the card's details and reads every layover duration
    async fn read_layovers(&self, ctx: &StepContext<'_>) -> Result<Vec<ClockDuration>, StepFailure> {
        let link = ctx
            .session
            .wait_for_visible(&locators::details_link(), ctx.timing.results_timeout)
            .await?;
        ctx.session.click(&link).await?;
        ctx.journal.info("Flight details page clicked");

        let layovers = locators::layover_durations();
        ctx.session
            .wait_for(&layovers, ctx.timing.results_timeout)
            .await
            .map_err(|e| StepFailure::extraction(format!("layover duration not found: {}", e)))?;

        let mut legs = Vec::new();
        for element in ctx.session.find_all(&layovers).await? {
            let text = ctx.session.read_text(&element).await?;
            legs.push(parse_leg_duration(&text, ctx.journal));
        }
        ctx.journal.info("Transit duration extracted");
        Ok(legs)
    }

    async fn extract_offer(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        if ctx.selected_card.is_none() {
            return Err(StepFailure::extraction("no result card selected"));
        }

        let departure_text =
            read_required_text(ctx, &locators::departure_time(), "departure time").await?;
        let arrival_text =
            read_required_text(ctx, &locators::arrival_time(), "arrival time").await?;
        let label = read_required_text(
            ctx,
            &locators::flight_type_and_duration(),
            "flight type",
        )
        .await?;
        let price_text = read_required_text(ctx, &locators::price(), "price").await?;
        let price = parse_price(&price_text, PriceLocale::En)?;
        ctx.price_text = Some(price_text);

        let (flight_type, duration_text) = split_type_and_duration(&label);
        let transit_legs = if is_nonstop(flight_type) {
            Vec::new()
        } else {
            self.read_layovers(ctx).await?
        };

        ctx.offer = Some(ExtractedOffer {
            departure_time: required_clock_time(&departure_text, "departure time")?,
            arrival_time: required_clock_time(&arrival_text, "arrival time")?,
            travel_duration: parse_leg_duration(duration_text, ctx.journal),
            transit_legs,
            price,
        });
        ctx.journal.info("Flight data scraped successfully");
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for QatarAdapter {
    fn airline(&self) -> AirlineId {
        AirlineId::QatarAirways
    }

    fn fingerprint(&self) -> FingerprintProfile {
        FingerprintProfile::Standard
    }

    fn entry_url(&self, route: &Route) -> String {
        flight_selection_url(route)
    }

    fn steps(&self) -> &[StepSpec] {
        &STEPS
    }

    async fn run_step(&self, step: StepKind, ctx: &mut StepContext<'_>) -> StepResult {
        let outcome = match step {
            StepKind::OpenSite => open_site(ctx, &self.entry_url(ctx.route)).await,
            StepKind::DismissConsent => return self.dismiss_consent(ctx).await,
            StepKind::SubmitSearch => self.wait_for_results(ctx).await,
            StepKind::SelectCheapestOffer => self.select_cheapest(ctx).await,
            StepKind::ExtractOffer => self.extract_offer(ctx).await,
            StepKind::SetTripType
            | StepKind::SetOrigin
            | StepKind::SetDestination
            | StepKind::SetDepartureDate
            | StepKind::ApplySort
            | StepKind::ApplyFilter => {
                return StepResult::ok_with(step, "encoded in the entry URL")
            }
        };
        StepResult::from_outcome(step, outcome)
    }
}
