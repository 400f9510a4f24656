//! Clock times and calendar dates
//!
//! All date handling uses explicit `chrono::NaiveDate` arithmetic; nothing
//! here consults the process locale.

use chrono::{Days, NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid clock regex"));

/// Output format for dates in result rows (`DD-MM-YYYY`)
pub const RECORD_DATE_FORMAT: &str = "%d-%m-%Y";

/// Output format for clock times in result rows (`HH:MM`)
pub const RECORD_TIME_FORMAT: &str = "%H:%M";

/// Reads the first `H:MM`/`HH:MM` clock time in `text`
///
/// Trailing day markers such as `"+1"` are ignored.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK.captures(text)?;
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Computes a departure date relative to the crawl date
pub fn departure_date_from(crawl_date: NaiveDate, days_ahead: u32) -> Option<NaiveDate> {
    crawl_date.checked_add_days(Days::new(u64::from(days_ahead)))
}

/// Formats a date as `DD-MM-YYYY`
pub fn format_record_date(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

/// Formats a date as an English long date, e.g. `Monday, 19 October 2026`
///
/// chrono's weekday and month names are English regardless of system locale.
pub fn english_long_date(date: NaiveDate) -> String {
    date.format("%A, %d %B %Y").to_string()
}
