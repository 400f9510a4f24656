use crate::config::types::{
    AirlineConfig, Config, CrawlerConfig, DriverConfig, OutputConfig, CONFIG_DATE_FORMAT,
};
use crate::model::AirlineId;
use crate::ConfigError;
use chrono::NaiveDate;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_driver_config(&config.driver)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_airlines(&config.airlines)?;
    Ok(())
}

/// Validates the browser automation settings
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "webdriver_url must use http or https, got '{}'",
            config.webdriver_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.poll_interval_ms < 1 || config.poll_interval_ms > 5000 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be between 1 and 5000, got {}",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates retry and timing settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.expected_new_records < 1 {
        return Err(ConfigError::Validation(
            "expected_new_records must be >= 1".to_string(),
        ));
    }

    if config.step_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "step_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.results_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "results_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.human_delay_min_ms > config.human_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "human_delay_min_ms ({}) must not exceed human_delay_max_ms ({})",
            config.human_delay_min_ms, config.human_delay_max_ms
        )));
    }

    if config.max_result_cards < 1 {
        return Err(ConfigError::Validation(
            "max_result_cards must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    if config.logs_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "logs_dir cannot be empty".to_string(),
        ));
    }

    if config.summary_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates airline entries and rejects duplicates
fn validate_airlines(entries: &[AirlineConfig]) -> Result<(), ConfigError> {
    let mut seen: HashSet<AirlineId> = HashSet::new();

    for entry in entries {
        let airline = entry.airline()?;
        if !seen.insert(airline) {
            return Err(ConfigError::Validation(format!(
                "Airline '{}' is configured more than once",
                airline
            )));
        }
        validate_airline_entry(entry)?;
    }

    Ok(())
}

fn validate_airline_entry(entry: &AirlineConfig) -> Result<(), ConfigError> {
    let origin = entry.origin.trim();
    if origin.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Airline '{}' must have an origin",
            entry.name
        )));
    }

    if entry.destinations.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Airline '{}' must have at least one destination",
            entry.name
        )));
    }

    for destination in &entry.destinations {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Airline '{}' has an empty destination",
                entry.name
            )));
        }
        if destination.eq_ignore_ascii_case(origin) {
            return Err(ConfigError::Validation(format!(
                "Airline '{}': destination '{}' equals the origin",
                entry.name, destination
            )));
        }
    }

    if let Some(date) = &entry.date {
        NaiveDate::parse_from_str(date.trim(), CONFIG_DATE_FORMAT).map_err(|_| {
            ConfigError::Validation(format!(
                "Airline '{}': date must be YYYY-MM-DD, got '{}'",
                entry.name, date
            ))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, origin: &str, destinations: &[&str]) -> AirlineConfig {
        AirlineConfig {
            name: name.to_string(),
            origin: origin.to_string(),
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
            days_ahead: 1,
            date: None,
        }
    }

    fn config(airlines: Vec<AirlineConfig>) -> Config {
        Config {
            driver: DriverConfig::default(),
            crawler: CrawlerConfig::default(),
            output: OutputConfig::default(),
            airlines,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&config(vec![entry("klm", "Frankfurt", &["Berlin"])])).is_ok());
    }

    #[test]
    fn test_max_attempts_bounds() {
        let mut crawler = CrawlerConfig::default();
        crawler.max_attempts = 0;
        assert!(validate_crawler_config(&crawler).is_err());

        crawler.max_attempts = 11;
        assert!(validate_crawler_config(&crawler).is_err());

        crawler.max_attempts = 10;
        assert!(validate_crawler_config(&crawler).is_ok());
    }

    #[test]
    fn test_human_delay_range() {
        let mut crawler = CrawlerConfig::default();
        crawler.human_delay_min_ms = 20_000;
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_webdriver_url_scheme() {
        let mut driver = DriverConfig::default();
        driver.webdriver_url = "ftp://localhost:9515".to_string();
        assert!(matches!(
            validate_driver_config(&driver),
            Err(ConfigError::InvalidUrl(_))
        ));

        driver.webdriver_url = "not a url".to_string();
        assert!(validate_driver_config(&driver).is_err());
    }

    #[test]
    fn test_unknown_airline() {
        let result = validate(&config(vec![entry("lufthansa", "Frankfurt", &["Berlin"])]));
        assert!(matches!(result, Err(ConfigError::InvalidAirline(_))));
    }

    #[test]
    fn test_duplicate_airline() {
        let result = validate(&config(vec![
            entry("klm", "Frankfurt", &["Berlin"]),
            entry("KLM", "Hamburg", &["Paris"]),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_destination_equal_to_origin() {
        let result = validate(&config(vec![entry("qatar", "DOH", &["FRA", "doh"])]));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_destinations() {
        let result = validate(&config(vec![entry("qatar", "DOH", &[])]));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_date_format() {
        let mut airline = entry("klm", "Frankfurt", &["Berlin"]);
        airline.date = Some("19-10-2026".to_string());
        assert!(validate_airline_entry(&airline).is_err());

        airline.date = Some("2026-10-19".to_string());
        assert!(validate_airline_entry(&airline).is_ok());
    }
}
