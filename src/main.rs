//! Fare-Harvester main entry point
//!
//! This is the command-line interface for the Fare-Harvester flight offer
//! crawler.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use fare_harvester::config::{load_config_with_hash, Config};
use fare_harvester::crawler::run_batch;
use fare_harvester::driver::WebDriverClient;
use fare_harvester::model::AirlineId;
use fare_harvester::output::{generate_markdown_summary, print_statistics};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Fare-Harvester: one-way flight offers from airline booking sites
///
/// Fare-Harvester drives a browser through each configured airline's booking
/// flow, extracts the cheapest one-way offer per route and appends it to a
/// per-airline CSV file.
#[derive(Parser, Debug)]
#[command(name = "fare-harvester")]
#[command(version)]
#[command(about = "Collects one-way flight offers from airline booking sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and print the route plan without starting a browser
    #[arg(long)]
    dry_run: bool,

    /// Only crawl the named airline (repeatable)
    #[arg(long = "airline", value_name = "NAME")]
    airlines: Vec<String>,

    /// Do not write the markdown summary
    #[arg(long)]
    no_summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.airlines.is_empty() {
        select_airlines(&mut config, &cli.airlines)?;
    }

    let crawl_date = Local::now().date_naive();

    if cli.dry_run {
        return handle_dry_run(&config, crawl_date);
    }

    handle_crawl(&config, config_hash, crawl_date, cli.no_summary).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fare_harvester=info,warn"),
            1 => EnvFilter::new("fare_harvester=debug,info"),
            2 => EnvFilter::new("fare_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Keeps only the airline entries named on the command line
fn select_airlines(config: &mut Config, names: &[String]) -> Result<()> {
    let wanted = names
        .iter()
        .map(|name| {
            name.parse::<AirlineId>()
                .map_err(|unknown| anyhow::anyhow!("Unknown airline: {}", unknown))
        })
        .collect::<Result<Vec<_>>>()?;

    config
        .airlines
        .retain(|entry| entry.airline().map(|a| wanted.contains(&a)).unwrap_or(false));

    if config.airlines.is_empty() {
        anyhow::bail!("None of the selected airlines are configured");
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and prints the route plan
fn handle_dry_run(config: &Config, crawl_date: chrono::NaiveDate) -> Result<()> {
    println!("=== Fare-Harvester Dry Run ===\n");

    println!("Driver:");
    println!("  WebDriver URL: {}", config.driver.webdriver_url);
    println!("  Headless: {}", config.driver.headless);
    println!("  Poll interval: {}ms", config.driver.poll_interval_ms);

    println!("\nCrawler:");
    println!("  Max attempts per route: {}", config.crawler.max_attempts);
    println!("  Retry backoff: {}s", config.crawler.retry_backoff_secs);
    println!(
        "  Expected new records per route: {}",
        config.crawler.expected_new_records
    );
    println!(
        "  Step / results timeout: {}s / {}s",
        config.crawler.step_timeout_secs, config.crawler.results_timeout_secs
    );

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_dir.display());
    println!("  Logs: {}", config.output.logs_dir.display());
    println!("  Summary: {}", config.output.summary_path.display());

    let plan = config.route_plan(crawl_date)?;
    let route_count: usize = plan.iter().map(|(_, routes)| routes.len()).sum();

    println!("\nRoute Plan ({} routes):", route_count);
    for (airline, routes) in &plan {
        println!("  - {} ({} routes)", airline, routes.len());
        for route in routes {
            println!("    * {}", route);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} route(s) for {} airline(s)",
        route_count,
        plan.len()
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: String,
    crawl_date: chrono::NaiveDate,
    no_summary: bool,
) -> Result<()> {
    for dir in [&config.output.results_dir, &config.output.logs_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let driver = WebDriverClient::new(&config.driver.webdriver_url)
        .context("Failed to set up the WebDriver client")?;

    tracing::info!(
        "Crawling {} airline(s) for crawl date {}",
        config.airlines.len(),
        crawl_date
    );

    let mut report = run_batch(config, Arc::new(driver), crawl_date).await?;
    report.config_hash = Some(config_hash);

    print_statistics(&report);

    if !no_summary {
        match generate_markdown_summary(&report, &config.output.summary_path) {
            Ok(()) => tracing::info!(
                "Summary written to {}",
                config.output.summary_path.display()
            ),
            Err(e) => tracing::error!("Failed to write summary: {}", e),
        }
    }

    Ok(())
}
