//! CSV result file, one per airline

use super::traits::{OutputResult, ResultStore};
use crate::model::{AirlineId, FlightOffer};
use crate::parse::{format_record_date, RECORD_TIME_FORMAT};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One output row; field order is the column order
#[derive(Debug, Serialize)]
struct OfferRow<'a> {
    airline_name: &'static str,
    crawling_date: String,
    departure_airport: &'a str,
    destination_airport: &'a str,
    date: String,
    travel_duration: String,
    departure_time: String,
    arrival_time: String,
    transit: bool,
    transit_duration: String,
    price: String,
}

impl<'a> OfferRow<'a> {
    fn from_offer(offer: &'a FlightOffer) -> Self {
        Self {
            airline_name: offer.airline.display_name(),
            crawling_date: format_record_date(offer.crawl_date),
            departure_airport: offer.origin.as_str(),
            destination_airport: offer.destination.as_str(),
            date: format_record_date(offer.departure_date),
            travel_duration: offer.travel_duration.to_string(),
            departure_time: offer.departure_time.format(RECORD_TIME_FORMAT).to_string(),
            arrival_time: offer.arrival_time.format(RECORD_TIME_FORMAT).to_string(),
            transit: offer.has_transit,
            transit_duration: offer.transit_duration.to_string(),
            price: offer.price.to_string(),
        }
    }
}

/// Append-only CSV store at `<results_dir>/results_<Airline>.csv`
///
/// The header is written exactly once, when the file is first created or
/// found empty. Existing files are only ever appended to.
#[derive(Debug)]
pub struct CsvResultStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the store for `airline` inside `results_dir`
    pub fn for_airline(results_dir: &Path, airline: AirlineId) -> Self {
        Self::new(results_dir.join(format!("results_{}.csv", airline.display_name())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for CsvResultStore {
    fn append(&self, offer: &FlightOffer) -> OutputResult<()> {
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
        writer.serialize(OfferRow::from_offer(offer))?;
        writer.flush()?;

        Ok(())
    }

    fn record_count(&self) -> OutputResult<u64> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }
}
