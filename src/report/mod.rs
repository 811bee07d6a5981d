pub mod types;

pub use types::{PrState, PullRequestRow, Report};

use crate::client::RateLimitInfo;
use crate::github::PullRequest;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from the enriched pull requests and the quota left.
pub fn build(repository: &str, pulls: &[PullRequest], rate_limit: Option<RateLimitInfo>) -> Report {
    let rows: Vec<PullRequestRow> = pulls
        .iter()
        .map(|pr| PullRequestRow {
            number: pr.number,
            author: pr.user.login.clone(),
            state: PrState::of(pr),
            diff_size: pr.diff_size,
            review_requests: pr.review_requests.as_ref().map_or(0, Vec::len),
            comments: pr.comments().count(),
        })
        .collect();
    let merged = rows.iter().filter(|row| row.state == PrState::Merged).count();

    Report {
        repository: repository.to_string(),
        rate_limit,
        total: rows.len(),
        merged,
        rows,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(repo = %report.repository, total = report.total))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Print the rate-limit details right after the connectivity check.
pub fn print_rate_limit(rate_limit: &RateLimitInfo) {
    println!("{}", format_rate_limit(rate_limit).dimmed());
}

fn format_rate_limit(rate_limit: &RateLimitInfo) -> String {
    format!(
        "Rate limit: {}/{} requests left, resets at {}",
        rate_limit.remaining,
        rate_limit.limit,
        rate_limit.reset_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn format_size(size: Option<u64>) -> String {
    size.map_or_else(|| "?".to_string(), |bytes| format!("{bytes} B"))
}

/// Format and print the report to the terminal with colors.
///
/// ═══ octo/widgets ═══
/// #42  alice  MERGED  1024 B  reviewers: 1  comments: 3
/// ...
/// ═══ 12 closed pull requests, 9 merged ═══
fn print_terminal_report(report: &Report) {
    println!();
    println!("═══ {} ═══", report.repository.bold());

    if report.rows.is_empty() {
        println!("  No closed pull requests.");
    }
    for row in &report.rows {
        println!(
            "#{:<6} {:<20} {:<8} {:>10}  reviewers: {}  comments: {}",
            row.number,
            row.author,
            colorize_state(row.state),
            format_size(row.diff_size),
            row.review_requests,
            row.comments
        );
    }
    println!();

    println!(
        "═══ {} closed pull requests, {} merged ═══",
        report.total, report.merged
    );
    if let Some(rate_limit) = &report.rate_limit {
        println!("{}", format_rate_limit(rate_limit).dimmed());
    }
    println!();
}

/// Write the report as a markdown file.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Closed pull requests of {}\n\n", report.repository));
    md.push_str(&format!(
        "**Total:** {} | **Merged:** {}\n\n",
        report.total, report.merged
    ));

    if report.rows.is_empty() {
        md.push_str("No closed pull requests.\n\n");
    } else {
        md.push_str("| PR | Author | State | Diff size | Review requests | Comments |\n");
        md.push_str("|---|---|---|---|---|---|\n");
        for row in &report.rows {
            md.push_str(&format!(
                "| #{} | {} | {} | {} | {} | {} |\n",
                row.number,
                row.author,
                row.state,
                format_size(row.diff_size),
                row.review_requests,
                row.comments
            ));
        }
        md.push('\n');
    }

    if let Some(rate_limit) = &report.rate_limit {
        md.push_str(&format!("_{}_\n", format_rate_limit(rate_limit)));
    }

    std::fs::write(path, md)?;
    Ok(())
}

/// Helper to colorize a state for terminal output.
fn colorize_state(state: PrState) -> colored::ColoredString {
    let label = state.to_string();
    match state {
        PrState::Merged => label.green().bold(),
        PrState::Closed => label.red().bold(),
        PrState::Open => label.yellow().bold(),
    }
}
