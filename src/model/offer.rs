use crate::model::{AirlineId, AirportCode, Route};
use crate::parse::{combine_legs, ClockDuration};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons an assembled offer is not a valid record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("Negative price: {0}")]
    NegativePrice(Decimal),

    #[error("Direct flight carries a transit duration of {0}")]
    TransitWithoutStop(ClockDuration),
}

/// Values read from a result card or detail view, already parsed
///
/// Adapters fill this in; the session turns it into a [`FlightOffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedOffer {
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub travel_duration: ClockDuration,
    /// One duration per intermediate stop; empty for a direct flight
    pub transit_legs: Vec<ClockDuration>,
    pub price: Decimal,
}

impl ExtractedOffer {
    pub fn has_transit(&self) -> bool {
        !self.transit_legs.is_empty()
    }
}

/// Canonical output record, one per successful session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightOffer {
    pub airline: AirlineId,
    pub crawl_date: NaiveDate,
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub departure_date: NaiveDate,
    pub travel_duration: ClockDuration,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub has_transit: bool,
    pub transit_duration: ClockDuration,
    pub price: Decimal,
}

impl FlightOffer {
    /// Assembles the record for `route` from extracted values
    ///
    /// Transit legs are combined into a single duration; a direct flight
    /// always gets `00:00`.
    pub fn assemble(
        airline: AirlineId,
        crawl_date: NaiveDate,
        route: &Route,
        extracted: ExtractedOffer,
    ) -> Self {
        let has_transit = extracted.has_transit();
        let transit_duration = if has_transit {
            combine_legs(&extracted.transit_legs)
        } else {
            ClockDuration::ZERO
        };

        Self {
            airline,
            crawl_date,
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            departure_date: route.date,
            travel_duration: extracted.travel_duration,
            departure_time: extracted.departure_time,
            arrival_time: extracted.arrival_time,
            has_transit,
            transit_duration,
            price: extracted.price,
        }
    }

    /// Checks the record-level invariants
    pub fn validate(&self) -> Result<(), OfferError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(OfferError::NegativePrice(self.price));
        }

        if !self.has_transit && !self.transit_duration.is_zero() {
            return Err(OfferError::TransitWithoutStop(self.transit_duration));
        }

        Ok(())
    }
}
