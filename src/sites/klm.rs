//! KLM booking flow (klm.de advanced search)
//!
//! The form is an Angular widget: trip type select, two autocomplete inputs
//! and a calendar overlay keyed by `bwc-day_<year>_<month0>_<day>`. Results
//! list economy fare tabs per flight; the chosen flight's details dialog
//! holds the schedule and the optional transfer time.

use super::common::{
    dismiss_consent, fill_autocomplete, open_site, read_required_text, required_clock_time,
    wait_and_click,
};
use super::{SiteAdapter, StepContext, StepSpec};
use crate::driver::{FingerprintProfile, Key, Locator};
use crate::model::{AirlineId, ExtractedOffer, Route};
use crate::parse::{format_record_date, parse_leg_duration, parse_price, PriceLocale};
use crate::state::{StepFailure, StepKind, StepResult};
use async_trait::async_trait;

/// Locators for the KLM booking pages
pub mod locators {
    use crate::driver::Locator;
    use chrono::{Datelike, NaiveDate};

    pub const ENTRY_URL: &str = "https://www.klm.de/search/advanced";

    const DETAILS_DIALOG: &str =
        r#"//*[@id="mat-mdc-dialog-0"]/div/div/bwsfc-flight-details/mat-dialog-content"#;

    pub fn consent_button() -> Locator {
        Locator::css("#accept_cookies_btn")
    }

    pub fn trip_type_select() -> Locator {
        Locator::css("#mat-input-0")
    }

    pub fn one_way_option() -> Locator {
        Locator::css("#mat-input-0 > option:nth-child(2)")
    }

    pub fn page_body() -> Locator {
        Locator::css("body")
    }

    pub fn origin_input() -> Locator {
        Locator::xpath(r#"//*[@id="mat-input-5"]"#)
    }

    pub fn destination_input() -> Locator {
        Locator::xpath(r#"//*[@id="mat-input-6"]"#)
    }

    pub fn date_picker_toggle() -> Locator {
        Locator::xpath(
            r#"//*[@id="bw-search-widget-expandable"]/div/bw-datepicker/bwc-form-input-container/div/label/mat-form-field/div[1]/div/div[2]/bwc-date-picker-toggle-button/button/span[3]"#,
        )
    }

    /// Calendar cell for `date`; months are zero-based in the cell id
    pub fn calendar_day(date: NaiveDate) -> Locator {
        Locator::xpath(format!(
            r#"//*[@id="bwc-day_{}_{}_{}"]"#,
            date.year(),
            date.month0(),
            date.day()
        ))
    }

    pub fn calendar_confirm() -> Locator {
        Locator::xpath("/html/body/div[3]/div[2]/div[2]/bwc-calendar/div/div[3]/button[2]")
    }

    pub fn search_button() -> Locator {
        Locator::xpath(
            r#"//*[@id="bw-search-widget-form-15hCmh4vxh"]/div/div[2]/div[2]/button"#,
        )
    }

    pub fn result_list() -> Locator {
        Locator::xpath(
            "/html/body/bw-app/bwc-page-template/mat-sidenav-container/mat-sidenav-content/div/main/div/bwsfe-search-result",
        )
    }

    pub fn result_filter() -> Locator {
        Locator::xpath(r#"//*[@id="bw-flight-list-result-filters__select-0"]"#)
    }

    pub fn result_filter_first_option() -> Locator {
        Locator::xpath(r#"//*[@id="bw-flight-list-result-filters__select-0"]/option[1]"#)
    }

    /// Clickable economy tab of the `index`-th flight (1-based)
    pub fn economy_card(index: usize) -> Locator {
        Locator::xpath(format!(
            r#"//*[@id="flight{}cabinClassCardTabECONOMY"]/div/div"#,
            index
        ))
    }

    pub fn fare_tabs() -> Locator {
        Locator::xpath(r#"//*[contains(@id, "mat-tab-content-")]"#)
    }

    /// Price of the first upsell item inside the `position`-th fare tab (1-based)
    pub fn fare_tab_price(position: usize) -> Locator {
        Locator::xpath(format!(
            r#"(//*[contains(@id, "mat-tab-content-")])[{}]/div/section/div/bws-flight-upsell-item[1]/div/div[1]/bws-flight-upsell-price/span"#,
            position
        ))
    }

    /// Details button of the `index`-th result (1-based)
    pub fn details_button(index: usize) -> Locator {
        Locator::xpath(format!(
            "/html/body/bw-app/bwc-page-template/mat-sidenav-container/mat-sidenav-content/div/main/div/bwsfe-search-result/div/section/bwsfe-search-result-list/section/ol/li[{}]/bwsfc-flight-offer/div/div[1]/div[2]/button",
            index
        ))
    }

    pub fn total_duration() -> Locator {
        Locator::xpath(format!(
            "{}/div/bwsfc-flight-details-flight-info/div[4]/span",
            DETAILS_DIALOG
        ))
    }

    pub fn departure_time() -> Locator {
        Locator::xpath(format!(
            "{}/ol/li[2]/div/div[3]/bwsfc-segment-nodes/div/bwsfc-segment-station-node[1]/div[2]/span",
            DETAILS_DIALOG
        ))
    }

    pub fn arrival_time() -> Locator {
        Locator::xpath(format!(
            "{}/ol/li[2]/div/div[3]/bwsfc-segment-nodes/div/bwsfc-segment-station-node[2]/div[2]/span",
            DETAILS_DIALOG
        ))
    }

    /// Transfer time line, only rendered for connecting flights
    pub fn transfer_time() -> Locator {
        Locator::xpath(format!("{}/ol/li[1]/div[2]/div[2]", DETAILS_DIALOG))
    }
}

const STEPS: [StepSpec; 10] = [
    StepSpec::escalate(StepKind::OpenSite),
    StepSpec::tolerate(StepKind::DismissConsent),
    StepSpec::escalate(StepKind::SetTripType),
    StepSpec::escalate(StepKind::SetOrigin),
    StepSpec::escalate(StepKind::SetDestination),
    StepSpec::escalate(StepKind::SetDepartureDate),
    StepSpec::escalate(StepKind::SubmitSearch),
    StepSpec::tolerate(StepKind::ApplyFilter),
    StepSpec::escalate(StepKind::SelectCheapestOffer),
    StepSpec::escalate(StepKind::ExtractOffer),
];

/// Adapter for klm.de
#[derive(Debug, Clone, Default)]
pub struct KlmAdapter;

impl KlmAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn set_trip_type(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::trip_type_select()).await?;
        wait_and_click(ctx, &locators::one_way_option()).await?;
        ctx.timing.settle().await;
        ctx.journal.info("One way flight selected");

        // Close the select overlay before touching the airport inputs
        match ctx.session.find(&locators::page_body()).await? {
            Some(body) => {
                if let Err(e) = ctx.session.click(&body).await {
                    ctx.journal
                        .error("Failed to click on an empty area", Some(&e.to_string()));
                }
            }
            None => ctx.journal.error("Page body not found", None),
        }
        Ok(())
    }

    async fn set_departure_date(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        let timeout = ctx.timing.step_timeout;
        let date = ctx.route.date;

        wait_and_click(ctx, &locators::date_picker_toggle()).await?;
        ctx.journal.info("Opened date picker");

        let day = ctx
            .session
            .wait_for_visible(&locators::calendar_day(date), timeout)
            .await?;
        ctx.session.scroll_into_view(&day).await?;
        ctx.session.click(&day).await?;

        let confirm = locators::calendar_confirm();
        let button = ctx.session.wait_for_visible(&confirm, timeout).await?;
        ctx.session.scroll_into_view(&button).await?;
        ctx.session.script_click(&button).await?;
        ctx.session.wait_for_absence(&confirm, timeout).await?;

        ctx.journal.info(&format!(
            "Entered departure date: {}",
            format_record_date(date)
        ));
        Ok(())
    }

    /// Refills an airport input that the widget emptied after the date pick
    async fn refill_if_empty(
        &self,
        ctx: &StepContext<'_>,
        field: &Locator,
        text: &str,
    ) -> Result<(), StepFailure> {
        let value = match ctx.session.find(field).await? {
            Some(element) => ctx.session.read_value(&element).await?,
            None => String::new(),
        };

        if value.trim().is_empty() {
            ctx.journal
                .error("Airport field is empty. It will be filled again.", None);
            fill_autocomplete(ctx, field, text, &[Key::Enter]).await
        } else {
            Ok(())
        }
    }

    async fn submit_search(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        self.refill_if_empty(ctx, &locators::origin_input(), ctx.route.origin.as_str())
            .await?;
        self.refill_if_empty(
            ctx,
            &locators::destination_input(),
            ctx.route.destination.as_str(),
        )
        .await?;

        let button = ctx
            .session
            .wait_for_visible(&locators::search_button(), ctx.timing.step_timeout)
            .await?;
        ctx.session.script_click(&button).await?;
        ctx.journal.info("Search submitted");

        ctx.session
            .wait_for(&locators::result_list(), ctx.timing.results_timeout)
            .await?;
        ctx.journal.info("Search results loaded");
        Ok(())
    }

    async fn apply_filter(&self, ctx: &StepContext<'_>) -> Result<(), StepFailure> {
        wait_and_click(ctx, &locators::result_filter()).await?;
        wait_and_click(ctx, &locators::result_filter_first_option()).await?;
        ctx.journal.info("Result filter applied");
        ctx.timing.settle().await;
        Ok(())
    }

    /// Opens the economy tab of the first flight that offers one
    async fn select_cheapest(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        for index in 1..=ctx.timing.max_result_cards {
            match wait_and_click(ctx, &locators::economy_card(index)).await {
                Ok(_) => {
                    ctx.journal.info("Economy option selected");
                    ctx.selected_card = Some(index);
                    ctx.timing.settle().await;
                    return Ok(());
                }
                Err(failure) => {
                    ctx.journal.error(
                        &format!("Error processing flight {}", index),
                        Some(&failure.message),
                    );
                }
            }
        }

        Err(StepFailure::extraction(format!(
            "no economy fare among the first {} results",
            ctx.timing.max_result_cards
        )))
    }

    async fn read_visible_price(&self, ctx: &StepContext<'_>) -> Result<String, StepFailure> {
        let tabs = ctx.session.find_all(&locators::fare_tabs()).await?;
        for (i, tab) in tabs.iter().enumerate() {
            if ctx.session.is_displayed(tab).await.unwrap_or(false) {
                return read_required_text(ctx, &locators::fare_tab_price(i + 1), "price").await;
            }
        }
        Err(StepFailure::extraction("no visible fare tab"))
    }

    async fn extract_offer(&self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let index = ctx
            .selected_card
            .ok_or_else(|| StepFailure::extraction("no result card selected"))?;

        ctx.session.scroll_by(250).await?;
        ctx.timing.settle().await;

        let price_text = self.read_visible_price(ctx).await?;
        let price = parse_price(&price_text, PriceLocale::De)?;
        ctx.journal.info("Price extracted");
        ctx.price_text = Some(price_text);

        let details = ctx
            .session
            .wait_for_visible(&locators::details_button(index), ctx.timing.step_timeout)
            .await?;
        ctx.session.script_click(&details).await?;
        ctx.timing.settle().await;

        let duration_text =
            read_required_text(ctx, &locators::total_duration(), "travel duration").await?;
        let arrival_text =
            read_required_text(ctx, &locators::arrival_time(), "arrival time").await?;
        let departure_text =
            read_required_text(ctx, &locators::departure_time(), "departure time").await?;

        let transit_legs = match ctx.session.find(&locators::transfer_time()).await? {
            Some(element) => {
                let text = ctx.session.read_text(&element).await?;
                ctx.journal.info("Transit time extracted");
                vec![parse_leg_duration(&text, ctx.journal)]
            }
            None => Vec::new(),
        };

        ctx.offer = Some(ExtractedOffer {
            departure_time: required_clock_time(&departure_text, "departure time")?,
            arrival_time: required_clock_time(&arrival_text, "arrival time")?,
            travel_duration: parse_leg_duration(&duration_text, ctx.journal),
            transit_legs,
            price,
        });
        ctx.journal.info("Flight details extracted");
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for KlmAdapter {
    fn airline(&self) -> AirlineId {
        AirlineId::Klm
    }

    fn fingerprint(&self) -> FingerprintProfile {
        FingerprintProfile::Hardened
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
                return dismiss_consent(ctx, &locators::consent_button()).await
            }
            StepKind::SetTripType => self.set_trip_type(ctx).await,
            StepKind::SetOrigin => {
                let origin = ctx.route.origin.as_str();
                fill_autocomplete(ctx, &locators::origin_input(), origin, &[Key::Enter]).await
            }
            StepKind::SetDestination => {
                let destination = ctx.route.destination.as_str();
                fill_autocomplete(
                    ctx,
                    &locators::destination_input(),
                    destination,
                    &[Key::Enter],
                )
                .await
            }
            StepKind::SetDepartureDate => self.set_departure_date(ctx).await,
            StepKind::SubmitSearch => self.submit_search(ctx).await,
            StepKind::ApplyFilter => self.apply_filter(ctx).await,
            StepKind::SelectCheapestOffer => self.select_cheapest(ctx).await,
            StepKind::ExtractOffer => self.extract_offer(ctx).await,
            StepKind::ApplySort => return StepResult::ok_with(step, "not offered by this site"),
        };
        StepResult::from_outcome(step, outcome)
    }
}
