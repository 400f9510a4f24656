//! Structured event journal
//!
//! Every crawl component receives an [`EventLog`] explicitly rather than
//! reaching for a process-wide logger. Two sinks are provided:
//! - [`CsvEventLog`] appends one row per event to a per-airline CSV file and
//!   mirrors each event to `tracing`
//! - [`MemoryEventLog`] keeps events in memory for tests

mod csv_log;
mod memory;

pub use csv_log::CsvEventLog;
pub use memory::MemoryEventLog;

use chrono::{Local, NaiveDate, NaiveTime};
use std::fmt;
use thiserror::Error;

/// Errors raised while writing journal rows
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Severity of a journal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One journal row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub level: LogLevel,
    pub message: String,
    pub error: Option<String>,
}

impl LogEvent {
    /// Creates an event stamped with the current local date and time
    pub fn now(level: LogLevel, message: impl Into<String>, error: Option<String>) -> Self {
        let now = Local::now().naive_local();
        Self {
            date: now.date(),
            time: now.time(),
            level,
            message: message.into(),
            error,
        }
    }
}

/// Capability for recording structured events
///
/// Recording never fails from the caller's point of view; sinks that can
/// fail report the problem through `tracing` instead.
pub trait EventLog: Send + Sync {
    /// Records a single event
    fn record(&self, event: LogEvent);

    /// Records an `INFO` event
    fn info(&self, message: &str) {
        self.record(LogEvent::now(LogLevel::Info, message, None));
    }

    /// Records an `ERROR` event with optional error detail
    fn error(&self, message: &str, error: Option<&str>) {
        self.record(LogEvent::now(
            LogLevel::Error,
            message,
            error.map(str::to_string),
        ));
    }
}
