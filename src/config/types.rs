use crate::crawler::RetryPolicy;
use crate::driver::{FingerprintProfile, SessionConfig};
use crate::model::{AirlineId, AirportCode, Route};
use crate::parse::departure_date_from;
use crate::sites::StepTiming;
use crate::{ConfigError, ConfigResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Date format accepted for explicit departure dates
pub const CONFIG_DATE_FORMAT: &str = "%Y-%m-%d";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

/// Main configuration structure for Fare-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "airline")]
    pub airlines: Vec<AirlineConfig>,
}

/// Browser automation endpoint and session settings
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Base URL of a running chromedriver
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub headless: bool,

    /// Interval between polls of a bounded wait (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            headless: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DriverConfig {
    /// Session settings for an adapter with the given fingerprint profile
    pub fn session_config(&self, fingerprint: FingerprintProfile) -> SessionConfig {
        SessionConfig {
            user_agent: self.user_agent.clone(),
            headless: self.headless,
            fingerprint,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Retry, wait and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Total sessions allowed per route, first attempt included
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "retry-backoff-secs", default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Record count delta that marks a route as done
    #[serde(rename = "expected-new-records", default = "default_expected_new_records")]
    pub expected_new_records: u64,

    #[serde(rename = "step-timeout-secs", default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    #[serde(rename = "results-timeout-secs", default = "default_results_timeout_secs")]
    pub results_timeout_secs: u64,

    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(rename = "human-delay-min-ms", default = "default_human_delay_min_ms")]
    pub human_delay_min_ms: u64,

    #[serde(rename = "human-delay-max-ms", default = "default_human_delay_max_ms")]
    pub human_delay_max_ms: u64,

    #[serde(rename = "max-result-cards", default = "default_max_result_cards")]
    pub max_result_cards: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
            expected_new_records: default_expected_new_records(),
            step_timeout_secs: default_step_timeout_secs(),
            results_timeout_secs: default_results_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            human_delay_min_ms: default_human_delay_min_ms(),
            human_delay_max_ms: default_human_delay_max_ms(),
            max_result_cards: default_max_result_cards(),
        }
    }
}

impl CrawlerConfig {
    pub fn step_timing(&self) -> StepTiming {
        StepTiming {
            step_timeout: Duration::from_secs(self.step_timeout_secs),
            results_timeout: Duration::from_secs(self.results_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            human_delay_min: Duration::from_millis(self.human_delay_min_ms),
            human_delay_max: Duration::from_millis(self.human_delay_max_ms),
            max_result_cards: self.max_result_cards,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }
}

/// Output file locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding `results_<Airline>.csv`
    #[serde(rename = "results-dir", default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Directory holding `logging_<Airline>.csv`
    #[serde(rename = "logs-dir", default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            logs_dir: default_logs_dir(),
            summary_path: default_summary_path(),
        }
    }
}

/// Routes to crawl for one airline
#[derive(Debug, Clone, Deserialize)]
pub struct AirlineConfig {
    /// Airline name, e.g. `klm`, `qatar-airways` or `austrian-airlines`
    pub name: String,

    /// Origin as typed into the booking form (city name or IATA code)
    pub origin: String,

    pub destinations: Vec<String>,

    /// Departure offset from the crawl date, used when `date` is absent
    #[serde(rename = "days-ahead", default = "default_days_ahead")]
    pub days_ahead: u32,

    /// Explicit departure date (`YYYY-MM-DD`)
    #[serde(default)]
    pub date: Option<String>,
}

impl AirlineConfig {
    pub fn airline(&self) -> ConfigResult<AirlineId> {
        self.name
            .parse()
            .map_err(|_| ConfigError::InvalidAirline(self.name.clone()))
    }

    /// Departure date for every route of this entry
    pub fn departure_date(&self, crawl_date: NaiveDate) -> ConfigResult<NaiveDate> {
        match &self.date {
            Some(date) => NaiveDate::parse_from_str(date.trim(), CONFIG_DATE_FORMAT).map_err(|e| {
                ConfigError::Validation(format!(
                    "Airline '{}' has invalid date '{}': {}",
                    self.name, date, e
                ))
            }),
            None => departure_date_from(crawl_date, self.days_ahead).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Airline '{}': {} + {} days is out of range",
                    self.name, crawl_date, self.days_ahead
                ))
            }),
        }
    }

    /// Expands this entry into routes, in declared destination order
    ///
    /// # Arguments
    ///
    /// * `crawl_date` - Date the batch runs on
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Route>)` - One route per destination
    /// * `Err(ConfigError)` - Blank airport or unusable date
    pub fn routes(&self, crawl_date: NaiveDate) -> ConfigResult<Vec<Route>> {
        let date = self.departure_date(crawl_date)?;
        let origin = AirportCode::new(&self.origin).ok_or_else(|| {
            ConfigError::Validation(format!("Airline '{}' has an empty origin", self.name))
        })?;

        self.destinations
            .iter()
            .map(|destination| {
                let destination = AirportCode::new(destination).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "Airline '{}' has an empty destination",
                        self.name
                    ))
                })?;
                Ok(Route::new(origin.clone(), destination, date))
            })
            .collect()
    }
}

impl Config {
    /// Expands every airline entry into its route list
    ///
    /// Entries naming the same airline are not merged; validation rejects
    /// duplicates before this is reached.
    pub fn route_plan(&self, crawl_date: NaiveDate) -> ConfigResult<Vec<(AirlineId, Vec<Route>)>> {
        self.airlines
            .iter()
            .map(|entry| Ok((entry.airline()?, entry.routes(crawl_date)?)))
            .collect()
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn default_expected_new_records() -> u64 {
    1
}

fn default_step_timeout_secs() -> u64 {
    10
}

fn default_results_timeout_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_human_delay_min_ms() -> u64 {
    3000
}

fn default_human_delay_max_ms() -> u64 {
    15000
}

fn default_max_result_cards() -> usize {
    10
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("results/summary.md")
}

fn default_days_ahead() -> u32 {
    1
}
