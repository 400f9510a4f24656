//! Locale-aware price parsing
//!
//! Prices arrive as display strings such as `"1.234,56 EUR"` (German
//! formatting) or `"€ 1,234.00"` (English formatting). Both normalize to a
//! [`Decimal`] with `.` as the separator.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,\s\u{a0}']*").expect("valid amount regex"));

/// Number formatting used by the source site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceLocale {
    /// Thousands separator `.`, decimal separator `,` (e.g. `1.234,56`)
    De,

    /// Thousands separator `,`, decimal separator `.` (e.g. `1,234.56`)
    En,
}

/// Raised when no amount can be read from the price text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No price found in '{text}'")]
pub struct PriceFormatError {
    pub text: String,
}

/// Parses a displayed price into a decimal amount
///
/// Currency symbols and suffixes are ignored; only the first digit run is
/// considered.
///
/// # Examples
///
/// ```
/// use fare_harvester::parse::{parse_price, PriceLocale};
///
/// assert_eq!(parse_price("1.234,56", PriceLocale::De).unwrap().to_string(), "1234.56");
/// assert_eq!(parse_price("89,00 EUR", PriceLocale::De).unwrap().to_string(), "89.00");
/// ```
pub fn parse_price(text: &str, locale: PriceLocale) -> Result<Decimal, PriceFormatError> {
    let error = || PriceFormatError {
        text: text.to_string(),
    };

    let raw = AMOUNT.find(text).ok_or_else(error)?.as_str();
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    let digits = digits.trim_end_matches(['.', ',']);

    let canonical = match locale {
        PriceLocale::De => digits.replace('.', "").replace(',', "."),
        PriceLocale::En => digits.replace(',', ""),
    };

    Decimal::from_str(&canonical).map_err(|_| error())
}
