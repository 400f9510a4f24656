//! Result store trait and errors
//!
//! A result store is the append-only sink for normalized flight offers.
//! The retry orchestrator also reads its record count to verify that a
//! session actually produced output.

use crate::model::FlightOffer;
use thiserror::Error;

/// Errors that can occur while persisting offers
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to format output: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only sink for flight offers
///
/// Implementations must be safe to share between sessions; appends are
/// serialized internally.
pub trait ResultStore: Send + Sync {
    /// Appends one record
    ///
    /// # Arguments
    ///
    /// * `offer` - A validated flight offer
    fn append(&self, offer: &FlightOffer) -> OutputResult<()>;

    /// Returns the number of data records currently stored
    ///
    /// The header row, if any, is not counted. A store that has never been
    /// written to reports zero.
    fn record_count(&self) -> OutputResult<u64>;
}
