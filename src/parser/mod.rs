//! Log Format Parsers
//!
//! Every supported tool writes one of four on-disk formats. Each format has an
//! extraction function that turns one JSON record into a normalized
//! [`UsageEvent`]; the shared [`BucketRecorder`] then prices the event and
//! files it under its local date.
//!
//! | Format | Layout | Token fields |
//! |--------|--------|--------------|
//! | [`SourceFormat::AgentCost`] | JSONL | `input`, `output`, `cacheRead`, `cacheWrite`, optional `cost` |
//! | [`SourceFormat::TokenCount`] | JSONL | `input_tokens`, `output_tokens`, `cache_*_input_tokens` |
//! | [`SourceFormat::Completions`] | JSONL | `prompt_tokens` / `completion_tokens` |
//! | [`SourceFormat::HistoryDocument`] | one JSON document | any of the above |
//!
//! Malformed lines are skipped. I/O failures and unusable document roots fail
//! the whole file, and the caller decides what to do with that.

pub mod agent_cost;
pub mod completions;
pub mod history_document;
pub mod token_count;

use crate::models::{DayBuckets, UsageEvent, DEFAULT_TIME_OF_DAY};
use crate::pricing::{is_recognized_model, PricingResolver};
use crate::timestamp_parser::{file_modified_ms, LocalClock};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

/// On-disk log format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    AgentCost,
    TokenCount,
    Completions,
    HistoryDocument,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::AgentCost => "agent-cost",
            SourceFormat::TokenCount => "token-count",
            SourceFormat::Completions => "completions",
            SourceFormat::HistoryDocument => "history-document",
        };
        f.write_str(name)
    }
}

impl SourceFormat {
    /// Extract a usage event from one line-delimited record.
    pub fn extract(&self, value: &Value, clock: &LocalClock) -> Option<UsageEvent> {
        match self {
            SourceFormat::AgentCost => agent_cost::extract(value, clock),
            SourceFormat::TokenCount => token_count::extract(value, clock),
            SourceFormat::Completions => completions::extract(value, clock),
            SourceFormat::HistoryDocument => history_document::extract_record(value, clock),
        }
    }

    /// Model a line sets for the lines after it, for formats that log the
    /// model apart from usage.
    pub fn context_model<'v>(&self, value: &'v Value) -> Option<&'v str> {
        match self {
            SourceFormat::Completions => completions::context_model(value),
            _ => None,
        }
    }

    /// Identity of a record that may be written more than once per file.
    pub fn dedup_key(&self, value: &Value) -> Option<String> {
        match self {
            SourceFormat::TokenCount => token_count::dedup_key(value),
            _ => None,
        }
    }
}

/// Shared, read-only inputs for parsing one file.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub pricing: &'a PricingResolver,
    pub clock: LocalClock,
}

/// Parse one file into its day buckets.
pub fn parse_file(path: &Path, format: SourceFormat, ctx: ParseContext<'_>) -> Result<DayBuckets> {
    let fallback_ms = file_modified_ms(path)?;
    match format {
        SourceFormat::HistoryDocument => history_document::parse(path, ctx, fallback_ms),
        line_format => {
            let processor = DayBucketProcessor::new(line_format, ctx, fallback_ms);
            process_jsonl_file(path, processor)
        }
    }
}

/// Trait for custom JSONL processing
pub trait JsonlProcessor {
    type Output;

    fn process_entry(&mut self, entry: Value, line_number: usize) -> Result<()>;
    fn finalize(self) -> Result<Self::Output>;
}

/// Feed every parseable line of `file_path` to `processor`. Lines that are
/// blank or not valid JSON are skipped.
pub fn process_jsonl_file<P: JsonlProcessor>(file_path: &Path, mut processor: P) -> Result<P::Output> {
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut buffer = Vec::new();
    let mut line_number = 0;
    let mut skipped = 0usize;

    loop {
        buffer.clear();
        let bytes = reader
            .read_until(b'\n', &mut buffer)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        if bytes == 0 {
            break;
        }
        line_number += 1;

        let line = buffer.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(entry) => processor.process_entry(entry, line_number)?,
            Err(e) => {
                skipped += 1;
                trace!(file = %file_path.display(), line_number, error = %e, "Skipping malformed line");
            }
        }
    }

    if skipped > 0 {
        debug!(file = %file_path.display(), skipped, "Skipped malformed lines");
    }

    processor.finalize()
}

/// Accumulates priced events into per-date buckets for one file.
pub struct BucketRecorder<'a> {
    ctx: ParseContext<'a>,
    fallback_ms: i64,
    buckets: DayBuckets,
}

impl<'a> BucketRecorder<'a> {
    pub fn new(ctx: ParseContext<'a>, fallback_ms: i64) -> Self {
        Self {
            ctx,
            fallback_ms,
            buckets: DayBuckets::new(),
        }
    }

    /// File one event. Events without a timestamp land on the fallback
    /// date at [`DEFAULT_TIME_OF_DAY`].
    pub fn record(&mut self, event: &UsageEvent) {
        let at = event.timestamp_ms.unwrap_or(self.fallback_ms);
        let Some(date) = self.ctx.clock.to_local_date(at) else {
            trace!(at, "Event timestamp out of range");
            return;
        };

        let cost = self.ctx.pricing.cost_of(event);
        let bucket = self.buckets.entry(date).or_default();
        bucket.add_tokens(event, cost);

        match event.timestamp_ms {
            Some(ms) => {
                if let Some(time) = self.ctx.clock.to_local_time(ms) {
                    bucket.push_time(time);
                }
            }
            None => bucket.push_time(DEFAULT_TIME_OF_DAY.to_string()),
        }
        if is_recognized_model(&event.model) {
            bucket.push_model(&event.model, at);
        }
    }

    pub fn finish(self) -> DayBuckets {
        self.buckets
    }
}

/// [`JsonlProcessor`] for the three line-delimited formats.
pub struct DayBucketProcessor<'a> {
    format: SourceFormat,
    recorder: BucketRecorder<'a>,
    seen_records: HashSet<String>,
    current_model: Option<String>,
}

impl<'a> DayBucketProcessor<'a> {
    pub fn new(format: SourceFormat, ctx: ParseContext<'a>, fallback_ms: i64) -> Self {
        Self {
            format,
            recorder: BucketRecorder::new(ctx, fallback_ms),
            seen_records: HashSet::new(),
            current_model: None,
        }
    }
}

impl JsonlProcessor for DayBucketProcessor<'_> {
    type Output = DayBuckets;

    fn process_entry(&mut self, entry: Value, line_number: usize) -> Result<()> {
        if let Some(model) = self.format.context_model(&entry) {
            self.current_model = Some(model.to_string());
        }
        let Some(mut event) = self.format.extract(&entry, &self.recorder.ctx.clock) else {
            return Ok(());
        };
        if event.model.is_empty() {
            if let Some(model) = &self.current_model {
                event.model = model.clone();
            }
        }
        if let Some(key) = self.format.dedup_key(&entry) {
            if !self.seen_records.insert(key) {
                trace!(line_number, "Skipping repeated record");
                return Ok(());
            }
        }
        self.recorder.record(&event);
        Ok(())
    }

    fn finalize(self) -> Result<Self::Output> {
        Ok(self.recorder.finish())
    }
}

/// Follow `path` through nested objects.
pub(crate) fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// First object found at any of `paths`.
pub(crate) fn find_object<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| get_path(value, path))
        .find(|found| found.is_object())
}

/// First non-empty string found at any of `paths`.
pub(crate) fn find_string<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths
        .iter()
        .filter_map(|path| get_path(value, path))
        .filter_map(Value::as_str)
        .find(|found| !found.trim().is_empty())
}

/// First value found at any of `paths`, excluding nulls.
pub(crate) fn find_value<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| get_path(value, path))
        .find(|found| !found.is_null())
}

/// First token count present under `keys`; negative or missing counts read as 0.
pub(crate) fn read_count(map: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(as_count)
        .unwrap_or(0)
}

/// Like [`read_count`] but distinguishes "absent" from zero.
pub(crate) fn read_count_opt(map: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().filter_map(|key| map.get(*key)).find_map(as_count)
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
        .or_else(|| value.as_i64().map(|_| 0))
}

/// A cost given either as a bare number or as an object with a `total`.
pub(crate) fn read_cost(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Object(_) => value.get("total")?,
        other => other,
    };
    raw.as_f64().filter(|cost| cost.is_finite() && *cost >= 0.0)
}
