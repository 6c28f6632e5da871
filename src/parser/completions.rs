//! Chat/completions-style logs.
//!
//! Usage sits at the top level, inside a `response` envelope, or in the
//! per-turn `last_token_usage` of a rollout `token_count` event. Rollouts also
//! carry a cumulative `total_token_usage`, which is never read. Prompt counts
//! include cached tokens, so cached tokens are moved out of the input channel
//! and billed at the cache-read rate.

use super::{find_object, find_string, find_value, read_count, read_count_opt};
use crate::models::UsageEvent;
use crate::timestamp_parser::LocalClock;
use serde_json::Value;

pub fn extract(value: &Value, clock: &LocalClock) -> Option<UsageEvent> {
    let usage = find_object(
        value,
        &[
            &["response", "usage"],
            &["usage"],
            &["payload", "info", "last_token_usage"],
        ],
    )?;

    let prompt = read_count_opt(usage, &["prompt_tokens"])
        .unwrap_or_else(|| read_count(usage, &["input_tokens"]));
    let completion = read_count_opt(usage, &["completion_tokens"])
        .unwrap_or_else(|| read_count(usage, &["output_tokens"]));
    if prompt == 0 && completion == 0 {
        return None;
    }

    let cached = find_value(
        usage,
        &[
            &["prompt_tokens_details", "cached_tokens"],
            &["input_tokens_details", "cached_tokens"],
        ],
    )
    .and_then(Value::as_u64)
    .or_else(|| {
        read_count_opt(
            usage,
            &["cache_read_input_tokens", "cached_input_tokens", "cached_tokens"],
        )
    })
    .unwrap_or(0)
    .min(prompt);

    let timestamp_ms = find_value(
        value,
        &[
            &["created"],
            &["response", "created"],
            &["timestamp"],
            &["created_at"],
        ],
    )
    .and_then(|raw| clock.parse(raw));

    Some(UsageEvent {
        timestamp_ms,
        model: find_string(
            value,
            &[
                &["response", "model"],
                &["model"],
                &["payload", "info", "model"],
                &["payload", "model"],
            ],
        )
            .unwrap_or_default()
            .to_string(),
        input_tokens: prompt - cached,
        output_tokens: completion,
        cache_read_tokens: cached,
        cache_write_tokens: read_count(usage, &["cache_creation_input_tokens"]),
        precomputed_cost: None,
    })
}

/// Model announced by a line that may carry no usage itself, such as a
/// rollout `turn_context`. Later usage lines without a model inherit it.
pub fn context_model(value: &Value) -> Option<&str> {
    find_string(
        value,
        &[
            &["response", "model"],
            &["model"],
            &["payload", "model"],
            &["payload", "info", "model"],
            &["payload", "info", "model_name"],
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_seconds_and_response_envelope() {
        let line = json!({
            "created": 1_700_000_000,
            "response": {
                "model": "gpt-4o",
                "usage": {"prompt_tokens": 120, "completion_tokens": 30}
            }
        });
        let event = extract(&line, &LocalClock::utc()).unwrap();
        assert_eq!(event.timestamp_ms, Some(1_700_000_000_000));
        assert_eq!(event.model, "gpt-4o");
        assert_eq!(event.input_tokens, 120);
        assert_eq!(event.output_tokens, 30);
    }

    #[test]
    fn test_falls_back_to_input_output_names() {
        let line = json!({"usage": {"input_tokens": 7, "output_tokens": 3}});
        let event = extract(&line, &LocalClock::utc()).unwrap();
        assert_eq!(event.input_tokens, 7);
        assert_eq!(event.output_tokens, 3);
        assert_eq!(event.timestamp_ms, None);
    }

    #[test]
    fn test_cached_prompt_tokens_move_to_cache_read() {
        let line = json!({
            "usage": {
                "prompt_tokens": 1000,
                "completion_tokens": 10,
                "prompt_tokens_details": {"cached_tokens": 800}
            }
        });
        let event = extract(&line, &LocalClock::utc()).unwrap();
        assert_eq!(event.input_tokens, 200);
        assert_eq!(event.cache_read_tokens, 800);
    }

    #[test]
    fn test_rollout_token_count_uses_last_turn_usage() {
        let line = json!({
            "timestamp": "2025-12-19T19:00:00Z",
            "type": "event_msg",
            "payload": {
                "type": "token_count",
                "info": {
                    "model": "gpt-5-codex",
                    "total_token_usage": {"input_tokens": 9000, "cached_input_tokens": 4000, "output_tokens": 900},
                    "last_token_usage": {"input_tokens": 1000, "cached_input_tokens": 200, "output_tokens": 300, "reasoning_output_tokens": 0, "total_tokens": 1300}
                }
            }
        });
        let event = extract(&line, &LocalClock::utc()).unwrap();
        assert_eq!(event.input_tokens, 800);
        assert_eq!(event.cache_read_tokens, 200);
        assert_eq!(event.output_tokens, 300);
        assert_eq!(event.model, "gpt-5-codex");
        assert!(event.timestamp_ms.is_some());
    }

    #[test]
    fn test_rollout_events_without_usage_are_skipped() {
        let line = json!({
            "timestamp": "2025-12-19T19:00:00Z",
            "type": "event_msg",
            "payload": {"type": "token_count", "info": null}
        });
        assert!(extract(&line, &LocalClock::utc()).is_none());

        let line = json!({"type": "response_item", "payload": {"type": "message", "role": "user"}});
        assert!(extract(&line, &LocalClock::utc()).is_none());
    }

    #[test]
    fn test_context_model_from_turn_context() {
        let line = json!({
            "type": "turn_context",
            "payload": {"cwd": "/work", "model": "gpt-5-codex", "effort": "high"}
        });
        assert_eq!(context_model(&line), Some("gpt-5-codex"));
        assert_eq!(context_model(&json!({"type": "session_meta"})), None);
    }

    #[test]
    fn test_skips_zero_prompt_and_completion() {
        let line = json!({"usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}});
        assert!(extract(&line, &LocalClock::utc()).is_none());
    }
}
