//! Text normalization for scraped values
//!
//! This module turns on-page display text into typed values:
//! - Leg/travel durations (`"2h 10min"`) into [`ClockDuration`]
//! - Locale-formatted prices into `rust_decimal::Decimal`
//! - Clock times and calendar dates

mod clock;
mod duration;
mod price;

pub use clock::{
    departure_date_from, english_long_date, format_record_date, parse_clock_time,
    RECORD_DATE_FORMAT, RECORD_TIME_FORMAT,
};
pub use duration::{combine_legs, parse_leg_duration, try_parse_leg_duration, ClockDuration};
pub use price::{parse_price, PriceFormatError, PriceLocale};
