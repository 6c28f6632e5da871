//! Core Data Models
//!
//! This module defines the data structures that flow through the ledger pipeline,
//! from a single usage record read off disk to the persisted session ledger.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`UsageEvent`] - one normalized usage record extracted from a log line
//! 2. **Accumulation**: [`DayBucket`] - usage for one local calendar date within one file
//! 3. **Persistence**: [`Session`] - one `(source, file, date)` record in the ledger
//! 4. **Reports**: [`Summary`] - today / month / per-source rollups
//!
//! ## Pricing Data
//! - [`PricingRate`] - USD per million tokens for the four token channels

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Costs below this are treated as noise and never persisted.
pub const NEGLIGIBLE_COST: f64 = 0.0001;

/// Time-of-day used when no event in a day carried a timestamp.
pub const DEFAULT_TIME_OF_DAY: &str = "00:00";

/// A single usage record, normalized across all log formats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageEvent {
    pub timestamp_ms: Option<i64>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub precomputed_cost: Option<f64>,
}

impl UsageEvent {
    pub fn has_tokens(&self) -> bool {
        self.input_tokens > 0
            || self.output_tokens > 0
            || self.cache_read_tokens > 0
            || self.cache_write_tokens > 0
    }
}

/// Usage accumulated for one local date inside one file.
#[derive(Debug, Clone, Default)]
pub struct DayBucket {
    pub cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub models_seen: Vec<String>,
    pub times_of_day: Vec<String>,
    /// Timestamp of the event that set `last_model`.
    pub(crate) last_model_at: Option<i64>,
    pub(crate) last_model: Option<String>,
}

impl DayBucket {
    pub fn add_tokens(&mut self, event: &UsageEvent, cost: f64) {
        self.cost += cost;
        self.input_tokens = self.input_tokens.saturating_add(event.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(event.output_tokens);
        self.cache_read = self.cache_read.saturating_add(event.cache_read_tokens);
        self.cache_write = self.cache_write.saturating_add(event.cache_write_tokens);
    }

    /// Records a model for the day. `at` is the effective event time; a later
    /// or equal time replaces the current day model.
    pub fn push_model(&mut self, model: &str, at: i64) {
        if !self.models_seen.iter().any(|seen| seen == model) {
            self.models_seen.push(model.to_string());
        }
        let newer = match self.last_model_at {
            Some(current) => at >= current,
            None => true,
        };
        if newer {
            self.last_model_at = Some(at);
            self.last_model = Some(model.to_string());
        }
    }

    pub fn push_time(&mut self, time: String) {
        self.times_of_day.push(time);
    }

    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    pub fn earliest_time(&self) -> Option<&str> {
        self.times_of_day.iter().map(String::as_str).min()
    }
}

/// Day buckets of a single file, ordered by date.
pub type DayBuckets = BTreeMap<String, DayBucket>;

/// One persisted `(source, file, date)` accounting record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub date: String,
    #[serde(default = "default_time")]
    pub time: String,
    pub source: String,
    pub file: String,
    pub cost: f64,
    #[serde(rename = "inputTokens", default)]
    pub input_tokens: u64,
    #[serde(rename = "outputTokens", default)]
    pub output_tokens: u64,
    #[serde(rename = "cacheRead", default)]
    pub cache_read: u64,
    #[serde(rename = "cacheWrite", default)]
    pub cache_write: u64,
    #[serde(default)]
    pub model: String,
}

fn default_time() -> String {
    DEFAULT_TIME_OF_DAY.to_string()
}

impl Session {
    /// Identity key; unique within a persisted ledger.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.source, self.file, self.date)
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read)
            .saturating_add(self.cache_write)
    }
}

/// Token rates in USD per 1,000,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRate {
    pub input: f64,
    pub output: f64,
    #[serde(rename = "cacheWrite")]
    pub cache_write: f64,
    #[serde(rename = "cacheRead")]
    pub cache_read: f64,
}

impl PricingRate {
    pub const fn new(input: f64, output: f64, cache_write: f64, cache_read: f64) -> Self {
        Self {
            input,
            output,
            cache_write,
            cache_read,
        }
    }

    pub fn cost_of(&self, event: &UsageEvent) -> f64 {
        (event.input_tokens as f64 * self.input
            + event.output_tokens as f64 * self.output
            + event.cache_write_tokens as f64 * self.cache_write
            + event.cache_read_tokens as f64 * self.cache_read)
            / 1_000_000.0
    }
}

/// Rollup statistics over the merged ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: String,
    pub today: String,
    pub current_month: String,
    /// Per-source totals plus a `grand_total` entry.
    pub totals: BTreeMap<String, f64>,
    pub today_cost: f64,
    pub month_cost: f64,
    /// Per-source counts plus a `total` entry.
    pub session_counts: BTreeMap<String, u64>,
}

impl Summary {
    pub fn grand_total(&self) -> f64 {
        self.totals.get("grand_total").copied().unwrap_or(0.0)
    }

    pub fn total_sessions(&self) -> u64 {
        self.session_counts.get("total").copied().unwrap_or(0)
    }
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
