//! Cost-aware agent session logs.
//!
//! ```json
//! {"type":"message","timestamp":"2025-01-10T10:00:00.000Z",
//!  "message":{"role":"assistant","model":"claude-opus-4-6",
//!   "usage":{"input":1200,"output":340,"cacheRead":9000,"cacheWrite":0,
//!            "cost":{"total":0.0213}}}}
//! ```

use super::{find_object, find_string, find_value, read_cost, read_count};
use crate::models::UsageEvent;
use crate::timestamp_parser::LocalClock;
use serde_json::Value;

pub fn extract(value: &Value, clock: &LocalClock) -> Option<UsageEvent> {
    let usage = find_object(value, &[&["message", "usage"], &["usage"]])?;

    let input_tokens = read_count(usage, &["input"]);
    let output_tokens = read_count(usage, &["output"]);
    let precomputed_cost = usage.get("cost").and_then(read_cost);

    let has_cost = precomputed_cost.map_or(false, |cost| cost > 0.0);
    if !has_cost && input_tokens == 0 && output_tokens == 0 {
        return None;
    }

    let model = find_string(value, &[&["message", "model"], &["model"], &["message", "modelId"]])
        .unwrap_or_default()
        .to_string();
    let timestamp_ms = find_value(value, &[&["timestamp"], &["message", "timestamp"]])
        .and_then(|raw| clock.parse(raw));

    Some(UsageEvent {
        timestamp_ms,
        model,
        input_tokens,
        output_tokens,
        cache_read_tokens: read_count(usage, &["cacheRead"]),
        cache_write_tokens: read_count(usage, &["cacheWrite"]),
        precomputed_cost,
    })
}
