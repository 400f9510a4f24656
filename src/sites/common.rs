//! Step helpers shared by the site adapters

use super::StepContext;
use crate::driver::{ElementRef, Key, Locator};
use crate::parse::parse_clock_time;
use crate::state::{StepFailure, StepKind, StepResult};
use chrono::NaiveTime;

/// Number of times an autocomplete fill is attempted before giving up
const FILL_ATTEMPTS: u32 = 2;

/// Navigates to `url` and lets the page settle
pub async fn open_site(ctx: &StepContext<'_>, url: &str) -> Result<(), StepFailure> {
    ctx.session.navigate(url).await?;
    ctx.journal.info(&format!("Opened {}", url));
    ctx.timing.settle().await;
    Ok(())
}

/// Clicks the consent button if the prompt is shown
///
/// An absent prompt is normal on repeat visits and reports `Ok`; a prompt
/// that is shown but cannot be clicked is a soft UI failure.
pub async fn dismiss_consent(ctx: &StepContext<'_>, button: &Locator) -> StepResult {
    let step = StepKind::DismissConsent;
    match ctx
        .session
        .wait_for_visible(button, ctx.timing.step_timeout)
        .await
    {
        Ok(element) => match ctx.session.click(&element).await {
            Ok(()) => {
                ctx.journal.info("Cookies accepted");
                ctx.timing.settle().await;
                StepResult::ok(step)
            }
            Err(e) => {
                ctx.journal
                    .error("Failed to accept cookies", Some(&e.to_string()));
                StepFailure::soft_ui(format!("consent button not clickable: {}", e))
                    .into_result(step)
            }
        },
        Err(e) if e.is_timeout() => {
            ctx.journal.info("No consent prompt shown");
            StepResult::ok_with(step, "consent prompt absent")
        }
        Err(e) => StepFailure::from(e).into_result(step),
    }
}

/// Waits for `locator` to become visible and clicks it
pub async fn wait_and_click(
    ctx: &StepContext<'_>,
    locator: &Locator,
) -> Result<ElementRef, StepFailure> {
    let element = ctx
        .session
        .wait_for_visible(locator, ctx.timing.step_timeout)
        .await?;
    ctx.session.click(&element).await?;
    Ok(element)
}

/// Types into an autocomplete field and verifies the committed value
///
/// The field is focused, cleared, filled with `text` and confirmed with
/// `confirm` keys. If the committed value no longer contains `text` the whole
/// fill is repeated once before failing with a field verification failure.
///
/// # Arguments
///
/// * `ctx` - Step context
/// * `field` - Locator of the input
/// * `text` - Intended value, e.g. an airport name or code
/// * `confirm` - Keys that pick the top suggestion
pub async fn fill_autocomplete(
    ctx: &StepContext<'_>,
    field: &Locator,
    text: &str,
    confirm: &[Key],
) -> Result<(), StepFailure> {
    for attempt in 1..=FILL_ATTEMPTS {
        let element = ctx
            .session
            .wait_for_visible(field, ctx.timing.step_timeout)
            .await?;
        ctx.session.click(&element).await?;
        ctx.session.set_text(&element, text).await?;
        ctx.timing.settle().await;

        for key in confirm {
            ctx.session.press_key(&element, *key).await?;
        }
        ctx.timing.settle().await;

        let committed = ctx.session.read_value(&element).await?;
        if value_matches(&committed, text) {
            ctx.journal.info(&format!("Entered '{}'", text));
            return Ok(());
        }

        ctx.journal.error(
            "Field did not retain the typed value",
            Some(&format!(
                "attempt {}: expected '{}', found '{}'",
                attempt, text, committed
            )),
        );
    }

    Err(StepFailure::field_verification(format!(
        "{} did not retain '{}'",
        field, text
    )))
}

fn value_matches(committed: &str, intended: &str) -> bool {
    committed
        .to_lowercase()
        .contains(&intended.trim().to_lowercase())
}

/// Reads non-empty text from a required element
///
/// A missing element or blank text is an extraction failure.
pub async fn read_required_text(
    ctx: &StepContext<'_>,
    locator: &Locator,
    what: &str,
) -> Result<String, StepFailure> {
    let element = ctx
        .session
        .wait_for(locator, ctx.timing.step_timeout)
        .await
        .map_err(|e| StepFailure::extraction(format!("{} not found: {}", what, e)))?;

    let text = ctx
        .session
        .read_text(&element)
        .await
        .map_err(|e| StepFailure::extraction(format!("{} unreadable: {}", what, e)))?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StepFailure::extraction(format!("{} is empty", what)));
    }
    Ok(trimmed.to_string())
}

/// Parses a required clock time
pub fn required_clock_time(text: &str, what: &str) -> Result<NaiveTime, StepFailure> {
    parse_clock_time(text)
        .ok_or_else(|| StepFailure::extraction(format!("{} '{}' is not a clock time", what, text)))
}
