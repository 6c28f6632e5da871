//! Output Formatting and Display Management
//!
//! Human-readable terminal output with colors, and JSON output for
//! programmatic consumption. Everything here writes to stdout; diagnostics
//! go through `tracing` to stderr.
//!
//! ## Output Kinds
//! - **Progress lines**: one line per collected source with file and error counts
//! - **Summary**: today / month / grand totals followed by a per-source table
//! - **Sources**: the effective discovery table and which directories exist
//! - **JSON**: the summary, or the whole dashboard contract, pretty-printed

use crate::collector::SourceReport;
use crate::config::SourceConfig;
use crate::dashboard::DashboardData;
use crate::file_discovery::expand_home;
use crate::models::Summary;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_source_progress(&self, report: &SourceReport) {
        if report.dirs_found == 0 {
            println!(
                "   {} {}",
                report.source.bright_black(),
                "not found".bright_black()
            );
            return;
        }

        let mut line = format!(
            "   {} {} files → {} sessions, {}",
            report.source.bright_cyan(),
            report.files_parsed.to_string().bright_white(),
            report.sessions.to_string().bright_white(),
            format!("${:.2}", report.cost).bright_green()
        );
        if report.duplicate_files > 0 {
            line.push_str(&format!(" ({} duplicates skipped)", report.duplicate_files));
        }
        if report.file_errors > 0 {
            line.push_str(&format!(
                " {}",
                format!("{} errors", report.file_errors).bright_red()
            ));
        }
        println!("{}", line);
    }

    pub fn display_collection_header(&self) {
        println!("{} Scanning sources", "🔍".bright_yellow());
    }

    pub fn display_cache_status(&self, cached: usize, dropped: usize, merged: usize) {
        let mut line = format!(
            "{} Ledger: {} cached, {} after merge",
            "💾".bright_yellow(),
            cached.to_string().bright_white(),
            merged.to_string().bright_white().bold()
        );
        if dropped > 0 {
            line.push_str(&format!(
                " {}",
                format!("({} invalid entries dropped)", dropped).bright_red()
            ));
        }
        println!("{}", line);
    }

    pub fn display_summary(&self, summary: &Summary) {
        println!("\n{}", "=".repeat(60).bright_cyan());
        println!("{}", "AI Tool Usage Summary".bright_white().bold());
        println!("{}", "=".repeat(60).bright_cyan());

        println!(
            "\n{} Today ({}): {}",
            "📅".bright_blue(),
            summary.today.bright_white(),
            format!("${:.2}", summary.today_cost).bright_green().bold()
        );
        println!(
            "{} This month ({}): {}",
            "📆".bright_blue(),
            summary.current_month.bright_white(),
            format!("${:.2}", summary.month_cost).bright_green().bold()
        );
        println!(
            "{} All time: {} across {} sessions\n",
            "📊".bright_yellow(),
            format!("${:.2}", summary.grand_total()).bright_green().bold(),
            summary.total_sessions().to_string().bright_white().bold()
        );

        let mut sources: Vec<(&String, &f64)> = summary
            .totals
            .iter()
            .filter(|(name, _)| name.as_str() != "grand_total")
            .collect();
        sources.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (source, cost) in sources {
            let count = summary.session_counts.get(source).copied().unwrap_or(0);
            println!(
                "   {:<16} {:>10}  ({} sessions)",
                source.bright_cyan(),
                format!("${:.2}", cost).bright_green(),
                count.to_string().bright_white()
            );
        }
        println!();
    }

    pub fn display_sources(&self, sources: &[SourceConfig]) {
        println!("{} Discovery table", "🔍".bright_yellow());
        for source in sources {
            println!(
                "\n   {} ({}, {})",
                source.name.bright_cyan().bold(),
                source.format.to_string().bright_white(),
                source.patterns.join(", ")
            );
            for dir in &source.dirs {
                let marker = if expand_home(dir).is_dir() {
                    "✓".bright_green()
                } else {
                    "✗".bright_black()
                };
                println!("     {} {}", marker, dir);
            }
        }
        println!();
    }

    pub fn display_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", json);
        Ok(())
    }

    pub fn display_dashboard_written(&self, data: &DashboardData, path: &std::path::Path) {
        println!(
            "{} Dashboard data: {} ({} + {} sessions)",
            "📈".bright_yellow(),
            path.display().to_string().bright_white(),
            data.sessions.len(),
            data.other_sessions.len()
        );
    }
}
