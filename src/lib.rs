//! Usage Ledger Library
//!
//! Aggregates the usage logs that local AI coding tools write to disk into a
//! single day-bucketed cost ledger, and publishes that ledger for a dashboard.
//!
//! ## Core Features
//!
//! - **Four log formats**: cost-aware agent logs, token-count logs,
//!   completions-style logs and whole-document histories
//! - **Open-ended pricing**: an ordered rule table that maps free-text model
//!   identifiers to per-million-token rates, extensible from config
//! - **Idempotent ledger**: re-scanning replaces a file's day rows instead of
//!   adding to them, and the ledger is saved atomically
//! - **Versioned discovery table**: which tools to read and where, as config
//!
//! ## Architecture Overview
//!
//! - [`pricing`] - Model identifier to rate resolution
//! - [`timestamp_parser`] - Timestamp normalization and local date bucketing
//! - [`parser`] - Per-format extraction into day buckets
//! - [`file_discovery`] - Bounded-depth directory walking
//! - [`collector`] - One discovery-table row to sessions
//! - [`aggregator`] - Day buckets to ledger sessions
//! - [`cache`] - Ledger load, merge and atomic save
//! - [`summary`] - Today / month / per-source rollups
//! - [`dashboard`] - The data contract consumed by the dashboard
//! - [`analyzer`] - The end-to-end pipeline
//! - [`config`] - Configuration with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty formats
//!
//! ## Main Entry Point
//!
//! ```no_run
//! use usage_ledger::{Config, LedgerAnalyzer, ScanOptions};
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = LedgerAnalyzer::new(Config::load(None)?)?;
//! let outcome = analyzer.scan(ScanOptions::default())?;
//! println!("${:.2} total", outcome.dashboard.summary.grand_total());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod collector;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod file_discovery;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod summary;
pub mod timestamp_parser;

pub use analyzer::{LedgerAnalyzer, ScanOptions, ScanOutcome};
pub use config::Config;
pub use models::*;
