use super::{EventLog, JournalError, LogEvent, LogLevel};
use crate::model::AirlineId;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Serialize)]
struct LogRow<'a> {
    date: String,
    time: String,
    level: &'static str,
    message: &'a str,
    error: &'a str,
}

/// Append-only CSV journal, one file per airline
///
/// The file and its parent directory are created on the first event, with a
/// `date,time,level,message,error` header. Every event is also emitted as a
/// `tracing` event so the console shows the same trail.
#[derive(Debug)]
pub struct CsvEventLog {
    path: PathBuf,
    source: String,
    write_lock: Mutex<()>,
}

impl CsvEventLog {
    /// Creates a journal writing to `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Target CSV file; nothing is created until the first event
    /// * `source` - Label attached to mirrored `tracing` events
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the journal for `airline` at `<logs_dir>/logging_<Airline>.csv`
    pub fn for_airline(logs_dir: &Path, airline: AirlineId) -> Self {
        let path = logs_dir.join(format!("logging_{}.csv", airline.display_name()));
        Self::new(path, airline.display_name())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one event, creating the file with a header if needed
    pub fn try_record(&self, event: &LogEvent) -> Result<(), JournalError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let is_new = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        writer.serialize(LogRow {
            date: event.date.format("%d-%m-%Y").to_string(),
            time: event.time.format("%H:%M:%S").to_string(),
            level: event.level.as_str(),
            message: &event.message,
            error: event.error.as_deref().unwrap_or(""),
        })?;
        writer.flush()?;

        Ok(())
    }

    fn mirror(&self, event: &LogEvent) {
        match (event.level, event.error.as_deref()) {
            (LogLevel::Info, _) => {
                tracing::info!(source = %self.source, "{}", event.message);
            }
            (LogLevel::Error, Some(error)) => {
                tracing::error!(source = %self.source, error = %error, "{}", event.message);
            }
            (LogLevel::Error, None) => {
                tracing::error!(source = %self.source, "{}", event.message);
            }
        }
    }
}

impl EventLog for CsvEventLog {
    fn record(&self, event: LogEvent) {
        self.mirror(&event);
        if let Err(e) = self.try_record(&event) {
            tracing::warn!(
                "Failed to write journal row to {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_created_lazily() {
        let dir = TempDir::new().unwrap();
        let journal = CsvEventLog::for_airline(dir.path(), AirlineId::Klm);

        assert!(!journal.path().exists());
        journal.info("Crawler started");
        assert!(journal.path().exists());
        assert!(journal
            .path()
            .ends_with("logging_KLM.csv"));
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("logging_Test.csv");

        CsvEventLog::new(&path, "Test").info("first");
        let journal = CsvEventLog::new(&path, "Test");
        journal.error("second", Some("boom"));
        journal.info("third");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "date,time,level,message,error");
        assert!(lines[1].ends_with("INFO,first,"));
        assert!(lines[2].ends_with("ERROR,second,boom"));
        assert_eq!(
            content.matches("date,time,level,message,error").count(),
            1
        );
    }

    #[test]
    fn test_message_with_comma_is_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let journal = CsvEventLog::new(&path, "Test");
        journal.info("Berlin, Tegel");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[3], "Berlin, Tegel");
    }
}
