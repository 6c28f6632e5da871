//! Token-count logs in the Anthropic Messages API shape, one record per line.
//! Cost is always computed from the counts.

use super::{find_object, find_string, get_path, read_count};
use crate::models::UsageEvent;
use crate::timestamp_parser::LocalClock;
use serde_json::Value;

pub fn extract(value: &Value, clock: &LocalClock) -> Option<UsageEvent> {
    let usage = find_object(value, &[&["message", "usage"], &["usage"]])?;

    let event = UsageEvent {
        timestamp_ms: value.get("timestamp").and_then(|raw| clock.parse(raw)),
        model: find_string(value, &[&["message", "model"], &["model"]])
            .unwrap_or_default()
            .to_string(),
        input_tokens: read_count(usage, &["input_tokens"]),
        output_tokens: read_count(usage, &["output_tokens"]),
        cache_read_tokens: read_count(usage, &["cache_read_input_tokens"]),
        cache_write_tokens: read_count(usage, &["cache_creation_input_tokens"]),
        precomputed_cost: None,
    };

    if !event.has_tokens() {
        return None;
    }
    Some(event)
}

/// `messageId:requestId`, present only when both ids are.
pub fn dedup_key(value: &Value) -> Option<String> {
    let message_id = get_path(value, &["message", "id"])?.as_str()?;
    let request_id = find_string(value, &[&["requestId"], &["request_id"], &["request", "id"]])?;
    if message_id.is_empty() {
        return None;
    }
    Some(format!("{}:{}", message_id, request_id))
}
