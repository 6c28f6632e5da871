//! Whole-document session histories.
//!
//! The file is a single JSON value: either an array of records or an object
//! whose `history`, `steps`, `messages`, `records` or `entries` field holds
//! them. Records name their counters loosely, and some tools serialize the
//! usage as a JSON string inside a `text` field, so extraction tries each
//! known spelling in turn.

use super::{find_object, find_string, find_value, read_cost, read_count, BucketRecorder, ParseContext};
use crate::models::{DayBuckets, UsageEvent};
use crate::timestamp_parser::LocalClock;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::trace;

const RECORD_LISTS: &[&str] = &["history", "steps", "messages", "records", "entries"];

const TIMESTAMP_PATHS: &[&[&str]] = &[
    &["timestamp"],
    &["created_at"],
    &["createdAt"],
    &["startTime"],
    &["start_time"],
    &["ts"],
];

const INPUT_KEYS: &[&str] = &["input_tokens", "prompt_tokens", "tokensIn", "inputTokens", "input"];
const OUTPUT_KEYS: &[&str] = &["output_tokens", "completion_tokens", "tokensOut", "outputTokens", "output"];
const CACHE_READ_KEYS: &[&str] = &[
    "cache_read_input_tokens",
    "cache_read_tokens",
    "cacheReads",
    "cacheRead",
    "cached_tokens",
];
const CACHE_WRITE_KEYS: &[&str] = &[
    "cache_creation_input_tokens",
    "cache_write_tokens",
    "cacheWrites",
    "cacheWrite",
];

pub fn parse(path: &Path, ctx: ParseContext<'_>, fallback_ms: i64) -> Result<DayBuckets> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let root: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON document {}", path.display()))?;

    let records = match &root {
        Value::Array(records) => records,
        Value::Object(_) => match RECORD_LISTS
            .iter()
            .find_map(|key| root.get(*key).and_then(Value::as_array))
        {
            Some(records) => records,
            None => bail!("No record list in {}", path.display()),
        },
        _ => bail!("Unexpected document root in {}", path.display()),
    };

    let document_ms = find_value(&root, TIMESTAMP_PATHS).and_then(|raw| ctx.clock.parse(raw));
    let mut recorder = BucketRecorder::new(ctx, fallback_ms);

    for (index, record) in records.iter().enumerate() {
        let Some(mut event) = extract_record(record, &ctx.clock) else {
            trace!(file = %path.display(), index, "Record carries no usage");
            continue;
        };
        if event.timestamp_ms.is_none() {
            event.timestamp_ms = document_ms;
        }
        recorder.record(&event);
    }

    Ok(recorder.finish())
}

/// Extract usage from one history record.
pub fn extract_record(value: &Value, clock: &LocalClock) -> Option<UsageEvent> {
    let embedded = value
        .get("text")
        .and_then(Value::as_str)
        .and_then(|text| serde_json::from_str::<Value>(text).ok())
        .filter(Value::is_object);

    let usage = find_object(value, &[&["usage"], &["tokens"], &["metrics", "usage"]])
        .or(embedded.as_ref())
        .unwrap_or(value);

    let precomputed_cost = usage
        .get("cost")
        .or_else(|| value.get("cost"))
        .and_then(read_cost);

    let event = UsageEvent {
        timestamp_ms: find_value(value, TIMESTAMP_PATHS).and_then(|raw| clock.parse(raw)),
        model: find_string(value, &[&["model"], &["modelId"], &["model_id"], &["usage", "model"]])
            .or_else(|| embedded.as_ref().and_then(|e| find_string(e, &[&["model"], &["modelId"]])))
            .unwrap_or_default()
            .to_string(),
        input_tokens: read_count(usage, INPUT_KEYS),
        output_tokens: read_count(usage, OUTPUT_KEYS),
        cache_read_tokens: read_count(usage, CACHE_READ_KEYS),
        cache_write_tokens: read_count(usage, CACHE_WRITE_KEYS),
        precomputed_cost,
    };

    let has_cost = precomputed_cost.map_or(false, |cost| cost > 0.0);
    if !has_cost && !event.has_tokens() {
        return None;
    }
    Some(event)
}
