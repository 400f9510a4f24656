//! Value types shared across the crawl pipeline
//!
//! Routes are the immutable input to a session and flight offers its only
//! output; both are passed by value between components.

mod offer;
mod route;

pub use offer::{ExtractedOffer, FlightOffer, OfferError};
pub use route::{AirlineId, AirportCode, Route};
