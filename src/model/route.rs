use crate::parse::format_record_date;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Airline whose booking site is crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AirlineId {
    Klm,
    QatarAirways,
    AustrianAirlines,
}

impl AirlineId {
    /// Name written to the `airline_name` column and used in file names
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Klm => "KLM",
            Self::QatarAirways => "QatarAirways",
            Self::AustrianAirlines => "AustrianAirlines",
        }
    }

    /// Name used in configuration files and on the command line
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::Klm => "klm",
            Self::QatarAirways => "qatar-airways",
            Self::AustrianAirlines => "austrian-airlines",
        }
    }

    /// Returns all supported airlines
    pub fn all() -> [AirlineId; 3] {
        [Self::Klm, Self::QatarAirways, Self::AustrianAirlines]
    }
}

impl FromStr for AirlineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "klm" => Ok(Self::Klm),
            "qatar-airways" | "qatarairways" | "qatar" => Ok(Self::QatarAirways),
            "austrian-airlines" | "austrianairlines" | "austrian" => Ok(Self::AustrianAirlines),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for AirlineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Airport as typed into a site's search form
///
/// Depending on the site this is an IATA code (`FRA`) or a city name
/// (`Frankfurt`); it is kept verbatim apart from surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AirportCode(String);

impl AirportCode {
    /// Returns `None` for blank input
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Origin/destination/date triple driving one crawl session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub date: NaiveDate,
}

impl Route {
    pub fn new(origin: AirportCode, destination: AirportCode, date: NaiveDate) -> Self {
        Self {
            origin,
            destination,
            date,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            self.origin,
            self.destination,
            format_record_date(self.date)
        )
    }
}
