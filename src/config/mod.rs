//! Configuration module for Fare-Harvester
//!
//! This module handles loading, parsing, and validating the TOML route
//! configuration, and expanding airline entries into concrete routes.
//!
//! # Example
//!
//! ```no_run
//! use fare_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Configured airlines: {}", config.airlines.len());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{AirlineConfig, Config, CrawlerConfig, DriverConfig, OutputConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
