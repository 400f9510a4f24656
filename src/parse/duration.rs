//! Leg and travel duration parsing
//!
//! Booking sites render durations as `"2h 10min"`, `"45min"`, `"1h 15m"` or
//! with a label such as `"Transferzeit: 1h 20min"`. This module turns those
//! strings into a normalized [`ClockDuration`] and sums multi-leg transit times.

use crate::journal::EventLog;
use regex::Regex;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::LazyLock;

static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:std|h)").expect("valid hours regex"));

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m(?:in)?\b").expect("valid minutes regex"));

/// An hours:minutes pair, always normalized so that `minutes < 60`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockDuration {
    hours: u32,
    minutes: u32,
}

impl ClockDuration {
    /// The zero duration, rendered as `00:00`
    pub const ZERO: ClockDuration = ClockDuration {
        hours: 0,
        minutes: 0,
    };

    /// Creates a duration, carrying whole hours out of `minutes`
    ///
    /// # Examples
    ///
    /// ```
    /// use fare_harvester::ClockDuration;
    ///
    /// let d = ClockDuration::new(1, 75);
    /// assert_eq!((d.hours(), d.minutes()), (2, 15));
    /// assert_eq!(d.to_string(), "02:15");
    /// ```
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours: hours + minutes / 60,
            minutes: minutes % 60,
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0
    }

    /// Total length in minutes
    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

impl Add for ClockDuration {
    type Output = ClockDuration;

    fn add(self, rhs: Self) -> Self::Output {
        ClockDuration::new(self.hours + rhs.hours, self.minutes + rhs.minutes)
    }
}

impl Sum for ClockDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ClockDuration::ZERO, Add::add)
    }
}

impl fmt::Display for ClockDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

/// Parses a `"<H>h <M>min"` style duration strictly
///
/// Either component may be absent and defaults to zero, but at least one
/// must be present. Returns `None` when neither matches.
pub fn try_parse_leg_duration(text: &str) -> Option<ClockDuration> {
    let hours = capture_number(&HOURS, text);
    let minutes = capture_number(&MINUTES, text);

    if hours.is_none() && minutes.is_none() {
        return None;
    }

    Some(ClockDuration::new(
        hours.unwrap_or(0),
        minutes.unwrap_or(0),
    ))
}

/// Parses a leg duration, failing soft
///
/// Unparsable text yields `00:00` and an `ERROR` event on the journal.
pub fn parse_leg_duration(text: &str, journal: &dyn EventLog) -> ClockDuration {
    match try_parse_leg_duration(text) {
        Some(duration) => duration,
        None => {
            journal.error(
                "Failed to extract time from string",
                Some(&format!("unrecognized duration text '{}'", text.trim())),
            );
            ClockDuration::ZERO
        }
    }
}

/// Sums leg durations, carrying minutes over 59 into hours
pub fn combine_legs(legs: &[ClockDuration]) -> ClockDuration {
    legs.iter().copied().sum()
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{LogLevel, MemoryEventLog};

    #[test]
    fn test_parse_hours_and_minutes() {
        assert_eq!(
            try_parse_leg_duration("2h 10min"),
            Some(ClockDuration::new(2, 10))
        );
        assert_eq!(
            try_parse_leg_duration("1h 15m"),
            Some(ClockDuration::new(1, 15))
        );
    }

    #[test]
    fn test_parse_compact_forms() {
        assert_eq!(
            try_parse_leg_duration("2h10min"),
            Some(ClockDuration::new(2, 10))
        );
        assert_eq!(
            try_parse_leg_duration("1h15min"),
            Some(ClockDuration::new(1, 15))
        );
        assert_eq!(
            try_parse_leg_duration("13h05m"),
            Some(ClockDuration::new(13, 5))
        );
        assert_eq!(
            try_parse_leg_duration("3Std45min"),
            Some(ClockDuration::new(3, 45))
        );
    }

    #[test]
    fn test_parse_minutes_only() {
        assert_eq!(
            try_parse_leg_duration("45min"),
            Some(ClockDuration::new(0, 45))
        );
    }

    #[test]
    fn test_parse_hours_only() {
        assert_eq!(try_parse_leg_duration("13h"), Some(ClockDuration::new(13, 0)));
    }

    #[test]
    fn test_parse_with_label() {
        assert_eq!(
            try_parse_leg_duration("Transferzeit: 1h 20min"),
            Some(ClockDuration::new(1, 20))
        );
    }

    #[test]
    fn test_parse_normalizes_overflowing_minutes() {
        let d = try_parse_leg_duration("90min").unwrap();
        assert_eq!(d.to_string(), "01:30");
    }

    #[test]
    fn test_malformed_is_zero_with_event() {
        let journal = MemoryEventLog::new();
        let d = parse_leg_duration("soon", &journal);

        assert_eq!(d, ClockDuration::ZERO);
        let events = journal.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Error);
    }

    #[test]
    fn test_well_formed_emits_nothing() {
        let journal = MemoryEventLog::new();
        let d = parse_leg_duration("2h 10min", &journal);

        assert_eq!(d, ClockDuration::new(2, 10));
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_combine_legs_carries() {
        let total = combine_legs(&[ClockDuration::new(1, 45), ClockDuration::new(0, 30)]);
        assert_eq!(total, ClockDuration::new(2, 15));
    }

    #[test]
    fn test_combine_two_stops() {
        let total = combine_legs(&[ClockDuration::new(3, 20), ClockDuration::new(1, 50)]);
        assert_eq!(total.to_string(), "05:10");
    }

    #[test]
    fn test_combine_empty_is_zero() {
        assert_eq!(combine_legs(&[]), ClockDuration::ZERO);
    }

    #[test]
    fn test_display_pads_hours() {
        assert_eq!(ClockDuration::new(5, 0).to_string(), "05:00");
        assert_eq!(ClockDuration::new(0, 7).to_string(), "00:07");
    }
}
