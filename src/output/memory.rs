use super::traits::{OutputError, OutputResult, ResultStore};
use crate::model::FlightOffer;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// In-memory result store, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    offers: Mutex<Vec<FlightOffer>>,
    failing_appends: AtomicU32,
    failing_counts: AtomicU32,
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` appends fail with an I/O error
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` record count reads fail with an I/O error
    pub fn fail_next_counts(&self, count: u32) {
        self.failing_counts.store(count, Ordering::SeqCst);
    }

    /// Snapshot of every stored offer in append order
    pub fn offers(&self) -> Vec<FlightOffer> {
        self.offers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ResultStore for MemoryResultStore {
    fn append(&self, offer: &FlightOffer) -> OutputResult<()> {
        if take_failure(&self.failing_appends) {
            return Err(OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated append failure",
            )));
        }

        self.offers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(offer.clone());
        Ok(())
    }

    fn record_count(&self) -> OutputResult<u64> {
        if take_failure(&self.failing_counts) {
            return Err(OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated count failure",
            )));
        }
        let offers = self
            .offers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(offers.len() as u64)
    }
}
