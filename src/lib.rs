//! Fare-Harvester: one-way flight offer extraction from airline booking sites
//!
//! This crate drives browser sessions against airline booking UIs, fills the
//! search form, picks the cheapest one-way offer and normalizes it into a
//! single tabular record per route, retrying flaky sessions up to a bound.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod journal;
pub mod model;
pub mod output;
pub mod parse;
pub mod sites;
pub mod state;

use thiserror::Error;

/// Main error type for Fare-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Journal error: {0}")]
    Journal(#[from] journal::JournalError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SessionState,
        to: state::SessionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown airline: {0}")]
    InvalidAirline(String),
}

/// Result type alias for Fare-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{AirlineId, AirportCode, FlightOffer, Route};
pub use parse::{ClockDuration, PriceLocale};
pub use state::{AttemptOutcome, CrawlAttempt, SessionState, StepStatus};
