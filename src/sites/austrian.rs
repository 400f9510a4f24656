//! Austrian Airlines booking flow (austrian.com)
//!
//! Airports are entered first, then the trip type toggle and a calendar
//! whose day cells are labelled with English long dates. On the result page
//! the first row's stop indicator class tells how many layovers the itinerary
//! dialog lists.

use super::common::{
    dismiss_consent, fill_autocomplete, open_site, read_required_text, required_clock_time,
    wait_and_click,
};
use super::{SiteAdapter, StepContext, StepSpec};
use crate::driver::{FingerprintProfile, Key, Locator};
use crate::model::{AirlineId, ExtractedOffer, Route};
use crate::parse::{english_long_date, parse_leg_duration, parse_price, ClockDuration, PriceLocale};
use crate::state::{StepFailure, StepKind, StepResult};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static STOP_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"has-(\d+)-stop").expect("valid stop count regex"));

/// Locators for the Austrian Airlines booking pages
pub mod locators {
    use crate::driver::Locator;
    use crate::parse::english_long_date;
    use chrono::NaiveDate;

    pub const ENTRY_URL: &str = "https://www.austrian.com";

    const SEARCH_FORM: &str =
        "/html/body/div[3]/div[4]/div/div/div[2]/div/div/div[2]/div[1]/div/section/div[2]/div[1]/div/div/form";

    const RESULTS: &str =
        "/html/body/app/refx-app-layout/div/div[2]/refx-upsell/refx-basic-in-flow-layout/div/div[6]/div[4]/div/div";

    const FIRST_ROW: &str =
        "/html/body/app/refx-app-layout/div/div[2]/refx-upsell/refx-basic-in-flow-layout/div/div[6]/div[4]/div/div/div/refx-upsell-premium-cont/refx-upsell-premium-pres/div/mat-accordion/refx-upsell-premium-row-pres[1]";

    const FIRST_CARD: &str =
        "/div/div/refx-flight-card-pres/refx-basic-flight-card-layout/div/div/div[1]/div";

    const ITINERARY_DIALOG: &str =
        "/html/body/div[4]/div[2]/div/mat-dialog-container/refx-itinerary-details-dialog-pres/refx-dialog-pres/div/div[2]/div/div";

    pub fn consent_button() -> Locator {
        Locator::css("#cm-acceptAll")
    }

    pub fn origin_input() -> Locator {
        Locator::xpath(
            "/html/body/div[2]/div[4]/div/div/div[2]/div/div/div[2]/div[1]/div/section/div[2]/div[1]/div/div/form/div[2]/div[1]/div[1]/div[1]/div/div[1]/div[1]/div[1]/input",
        )
    }

    pub fn destination_input() -> Locator {
        Locator::css(r#"input[name="flightQuery.flightSegments[0].destinationCode"]"#)
    }

    pub fn round_trip_toggle() -> Locator {
        Locator::xpath(
            r#"//*[@id="dcep-tab-control-standalone3-fluge-section"]/div/div/form/div[1]/div/div/div[1]/button"#,
        )
    }

    pub fn one_way_option() -> Locator {
        Locator::xpath(
            r#"//*[@id="dcep-tab-control-standalone3-fluge-section"]/div/div/form/div[1]/div/div/div[2]/ul/li[2]"#,
        )
    }

    pub fn date_input() -> Locator {
        Locator::xpath(format!(
            "{}/div[2]/div[2]/div/div[1]/div[1]/input",
            SEARCH_FORM
        ))
    }

    /// Calendar cell whose aria label carries the English long date
    pub fn calendar_day(date: NaiveDate) -> Locator {
        Locator::xpath(format!(
            "//td[contains(@class, 'CalendarDay') and contains(@class, 'CalendarDay__default') and contains(@aria-label, '{}')]",
            english_long_date(date)
        ))
    }

    pub fn calendar_continue() -> Locator {
        Locator::xpath(
            "//button[contains(@class, 'btn-primary') and contains(@class, 'calendar-footer-continue-button') and @type='button' and span[text()='Weiter']]",
        )
    }

    pub fn search_button() -> Locator {
        Locator::xpath(format!("{}/div[2]/div[4]/button", SEARCH_FORM))
    }

    pub fn sort_menu() -> Locator {
        Locator::xpath(format!(
            "{}/div/refx-upsell-premium-cont/refx-upsell-premium-pres/div/div[1]/refx-upsell-premium-filtering-pres/div[2]/refx-upsell-premium-sorting-pres/refx-menu/div/a",
            RESULTS
        ))
    }

    pub fn sort_cheapest_option() -> Locator {
        Locator::xpath("/html/body/div[4]/div[2]/div/div/div/button[2]")
    }

    pub fn first_result_row() -> Locator {
        Locator::xpath(FIRST_ROW)
    }

    pub fn travel_duration() -> Locator {
        Locator::xpath(format!(
            "{}{}/div[2]/div/refx-flight-details/div/div[1]/div[1]/div/span[2]",
            FIRST_ROW, FIRST_CARD
        ))
    }

    pub fn departure_time() -> Locator {
        Locator::xpath(format!(
            "{}{}/div[1]/div/refx-bound-timeline/div[1]/div[1]/div[1]/div",
            FIRST_ROW, FIRST_CARD
        ))
    }

    pub fn arrival_time() -> Locator {
        Locator::xpath(format!(
            "{}{}/div[1]/div/refx-bound-timeline/div[1]/div[3]/div[1]/div",
            FIRST_ROW, FIRST_CARD
        ))
    }

    /// Element whose `class` encodes the stop count
    pub fn stop_indicator() -> Locator {
        Locator::xpath(format!(
            "{}{}/div[1]/div/refx-bound-timeline/div[1]/div[2]/div[2]",
            FIRST_ROW, FIRST_CARD
        ))
    }

    pub fn details_link() -> Locator {
        Locator::xpath(format!(
            "{}{}/div[2]/div/refx-flight-details/div/div[2]/a",
            FIRST_ROW, FIRST_CARD
        ))
    }

    /// Cheapest fare of the selected day in the date carousel
    pub fn price() -> Locator {
        Locator::xpath(format!(
            "{}/refx-calendar-cont/refx-calendar-pres/div/mat-expansion-panel/div/div/refx-carousel/div/ul/li[4]/div/button/span[1]/div[1]/div/refx-price-cont/refx-price/span/span",
            RESULTS
        ))
    }

    /// Layover duration of the `stop`-th stop (1-based) in the itinerary dialog
    pub fn stop_duration(stop: usize) -> Locator {
        Locator::xpath(format!(
            "{}/refx-flight-stop-details-pres[{}]/div/div/div/div[2]/div/div[2]",
            ITINERARY_DIALOG, stop
        ))
    }
}

const STEPS: [StepSpec; 10] = [
    StepSpec::escalate(StepKind::OpenSite),
    StepSpec::tolerate(StepKind::DismissConsent),
    StepSpec::escalate(StepKind::SetOrigin),
    StepSpec::escalate(StepKind::SetDestination),
    StepSpec::escalate(StepKind::SetTripType),
    StepSpec::escalate(StepKind::SetDepartureDate),
    StepSpec::escalate(StepKind::SubmitSearch),
    StepSpec::tolerate(StepKind::ApplySort),
    StepSpec::escalate(StepKind::SelectCheapestOffer),
    StepSpec::escalate(StepKind::ExtractOffer),
];

/// Reads the number of intermediate stops from the indicator's class list
///
/// `bound-nb-stop-container` alone means nonstop, `has-<n>-stop` gives the
/// count directly and a bare `has-stops` is rendered for two stops.
pub fn stop_count_from_class(class: &str) -> usize {
    if let Some(count) = STOP_COUNT
        .captures(class)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return count;
    }
    if class.split_whitespace().any(|c| c == "has-stops") {
        2
    } else {
        0
    }
}

/// Adapter for austrian.com
#[derive(Debug, Clone, Default)]
pub struct AustrianAdapter;

impl AustrianAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn set_airport(
        &self,
        ctx: &StepContext<'_>,
        field: &Locator,
        airport: &str,
    ) -> Result<(), StepFailure> {
        ctx.timing.human_pause().await;
        fill_autocomplete(ctx, field, airport, &[Key::ArrowDown, Key::Enter]).await?;
        ctx.timing.human_pause().await;
        Ok(())
    }

    async fn set_trip_type(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::round_trip_toggle()).await?;
        wait_and_click(ctx, &locators::one_way_option()).await?;
        ctx.journal.info("Choose One-Way Flight");
        Ok(())
    }

    async fn set_departure_date(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::date_input()).await?;
        ctx.timing.settle().await;

        wait_and_click(ctx, &locators::calendar_day(ctx.route.date)).await?;
        ctx.timing.settle().await;

        wait_and_click(ctx, &locators::calendar_continue()).await?;
        ctx.journal.info(&format!(
            "Entered departure date: {}",
            english_long_date(ctx.route.date)
        ));
        Ok(())
    }

    async fn submit_search(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::search_button()).await?;
        ctx.journal.info("Search started");
        ctx.session
            .wait_for(&locators::first_result_row(), ctx.timing.results_timeout)
            .await?;
        ctx.journal.info("Search results loaded");
        Ok(())
    }

    async fn apply_sort(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::sort_menu()).await?;
        wait_and_click(ctx, &locators::sort_cheapest_option()).await?;
        ctx.journal
            .info("Sorted flights from cheapest to most expensive");
        ctx.timing.settle().await;
        Ok(())
    }

    /// Takes the first row and reads its stop indicator
    async fn select_cheapest(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        ctx.session
            .wait_for(&locators::first_result_row(), ctx.timing.step_timeout)
            .await
            .map_err(|e| StepFailure::extraction(format!("no result row: {}", e)))?;

        let indicator = ctx
            .session
            .wait_for(&locators::stop_indicator(), ctx.timing.step_timeout)
            .await
            .map_err(|e| StepFailure::extraction(format!("no stop indicator: {}", e)))?;
        let class = ctx
            .session
            .read_attribute(&indicator, "class")
            .await?
            .unwrap_or_default();

        let stops = stop_count_from_class(&class);
        ctx.selected_card = Some(1);
        ctx.stop_count = Some(stops);
        ctx.journal
            .info(&format!("Selected first result ({} stop(s))", stops));
        Ok(())
    }

    /// Opens the itinerary dialog and reads one duration per stop
    async fn read_stop_durations(
        &self,
        ctx: &StepContext<'_>,
        stops: usize,
    ) -> Result<Vec<ClockDuration>, StepFailure> {
        wait_and_click(ctx, &locators::details_link()).await?;
        ctx.journal.info("Clicked details");
        ctx.timing.settle().await;

        let mut legs = Vec::with_capacity(stops);
        for stop in 1..=stops {
            let text = read_required_text(
                ctx,
                &locators::stop_duration(stop),
                &format!("stop {} duration", stop),
            )
            .await?;
            legs.push(parse_leg_duration(&text, ctx.journal));
        }
        ctx.journal
            .info("Calculated transit duration successfully");
        Ok(legs)
    }

    async fn extract_offer(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let stops = ctx
            .stop_count
            .ok_or_else(|| StepFailure::extraction("no result row selected"))?;

        let duration_text =
            read_required_text(ctx, &locators::travel_duration(), "travel duration").await?;
        let departure_text =
            read_required_text(ctx, &locators::departure_time(), "departure time").await?;
        let arrival_text =
            read_required_text(ctx, &locators::arrival_time(), "arrival time").await?;
        let price_text = read_required_text(ctx, &locators::price(), "price").await?;
        let price = parse_price(&price_text, PriceLocale::De)?;
        ctx.price_text = Some(price_text);

        let transit_legs = if stops > 0 {
            self.read_stop_durations(ctx, stops).await?
        } else {
            Vec::new()
        };

        ctx.offer = Some(ExtractedOffer {
            departure_time: required_clock_time(&departure_text, "departure time")?,
            arrival_time: required_clock_time(&arrival_text, "arrival time")?,
            travel_duration: parse_leg_duration(&duration_text, ctx.journal),
            transit_legs,
            price,
        });
        ctx.journal.info("Flight data scraped successfully");
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for AustrianAdapter {
    fn airline(&self) -> AirlineId {
        AirlineId::AustrianAirlines
    }

    fn fingerprint(&self) -> FingerprintProfile {
        FingerprintProfile::Standard
    }

    fn entry_url(&self, _route: &Route) -> String {
        locators::ENTRY_URL.to_string()
    }

    fn steps(&self) -> &[StepSpec] {
        &STEPS
    }

    async fn run_step(&self, step: StepKind, ctx: &mut StepContext<'_>) -> StepResult {
        let outcome = match step {
            StepKind::OpenSite => open_site(ctx, &self.entry_url(ctx.route)).await,
            StepKind::DismissConsent => {
                let result = dismiss_consent(ctx, &locators::consent_button()).await;
                ctx.timing.human_pause().await;
                return result;
            }
            StepKind::SetOrigin => {
                let origin = ctx.route.origin.as_str();
                self.set_airport(ctx, &locators::origin_input(), origin).await
            }
            StepKind::SetDestination => {
                let destination = ctx.route.destination.as_str();
                self.set_airport(ctx, &locators::destination_input(), destination)
                    .await
            }
            StepKind::SetTripType => self.set_trip_type(ctx).await,
            StepKind::SetDepartureDate => self.set_departure_date(ctx).await,
            StepKind::SubmitSearch => self.submit_search(ctx).await,
            StepKind::ApplySort => self.apply_sort(ctx).await,
            StepKind::SelectCheapestOffer => self.select_cheapest(ctx).await,
            StepKind::ExtractOffer => self.extract_offer(ctx).await,
            StepKind::ApplyFilter => return StepResult::ok_with(step, "not offered by this site"),
        };
        StepResult::from_outcome(step, outcome)
    }
}
