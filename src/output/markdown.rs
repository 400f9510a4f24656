//! Markdown summary generation
//!
//! This module renders a batch report as a human-readable markdown file:
//! run information, per-airline route tables and the routes that stayed
//! without a record.

use super::stats::BatchReport;
use super::traits::OutputResult;
use crate::parse::format_record_date;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The finished batch report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(report: &BatchReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a batch report as markdown
pub fn format_markdown_summary(report: &BatchReport) -> String {
    let mut md = String::new();

    md.push_str("# Fare-Harvester Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Crawl Date**: {}\n",
        format_record_date(report.crawl_date)
    ));
    md.push_str(&format!(
        "- **Started**: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!(
            "- **Finished**: {}\n",
            finished.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Routes**: {}\n", report.total_routes()));
    md.push_str(&format!(
        "- **Verified Routes**: {}\n",
        report.verified_routes()
    ));
    md.push_str(&format!("- **Attempts**: {}\n", report.total_attempts()));
    md.push_str(&format!("- **Offers Written**: {}\n", report.total_offers()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    for airline in &report.airlines {
        md.push_str(&format!("## {}\n\n", airline.airline));
        if airline.runs.is_empty() {
            md.push_str("No routes configured.\n\n");
            continue;
        }

        md.push_str("| Route | Attempts | Outcomes | New Records | Verified |\n");
        md.push_str("|-------|----------|----------|-------------|----------|\n");
        for run in &airline.runs {
            let outcomes: Vec<String> = run
                .attempts
                .iter()
                .map(|attempt| attempt.outcome.to_string())
                .collect();
            md.push_str(&format!(
                "| {} | {} | {} | {} / {} | {} |\n",
                run.route,
                run.attempts.len(),
                outcomes.join(", "),
                run.new_records,
                run.expected,
                if run.is_verified() { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }

    let failed: Vec<String> = report
        .airlines
        .iter()
        .flat_map(|airline| {
            airline
                .failed_routes()
                .into_iter()
                .map(move |route| format!("- {}: {}", airline.airline, route))
        })
        .collect();
    if !failed.is_empty() {
        md.push_str("## Unverified Routes\n\n");
        for line in failed {
            md.push_str(&line);
            md.push('\n');
        }
        md.push('\n');
    }

    md
}
