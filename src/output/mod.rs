//! Output module for crawl results and reports
//!
//! This module handles:
//! - Appending normalized flight offers to per-airline result files
//! - Aggregating batch statistics
//! - Generating markdown summaries of a batch

mod csv_store;
mod markdown;
mod memory;
pub mod stats;
mod traits;

pub use csv_store::CsvResultStore;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use memory::MemoryResultStore;
pub use stats::{print_statistics, AirlineReport, BatchReport};
pub use traits::{OutputError, OutputResult, ResultStore};
