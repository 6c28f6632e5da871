//! Model pricing resolution.
//!
//! Pricing is an ordered rule table of `(pattern, rate)` pairs matched as
//! case-insensitive substrings of the model identifier, most specific first.
//! The first matching rule wins; nothing matching falls back to the Sonnet
//! rate. Dots and underscores in identifiers are read as dashes, so
//! `claude-opus-4.6` and `claude-opus-4-6` price the same.

use crate::models::{PricingRate, UsageEvent};
use serde::{Deserialize, Serialize};

/// Fallback for empty or unrecognized identifiers.
pub const DEFAULT_RATE: PricingRate = PricingRate::new(3.0, 15.0, 3.75, 0.3);

const BUILTIN_RULES: &[(&str, PricingRate)] = &[
    // Anthropic: versioned tags ahead of the bare family names
    ("opus-4-6", PricingRate::new(5.0, 25.0, 6.25, 0.5)),
    ("opus-4-5", PricingRate::new(5.0, 25.0, 6.25, 0.5)),
    ("opus-4-1", PricingRate::new(15.0, 75.0, 18.75, 1.5)),
    ("opus-4-0", PricingRate::new(15.0, 75.0, 18.75, 1.5)),
    ("opus-4-2025", PricingRate::new(15.0, 75.0, 18.75, 1.5)),
    ("4-opus", PricingRate::new(15.0, 75.0, 18.75, 1.5)),
    ("3-opus", PricingRate::new(15.0, 75.0, 18.75, 1.5)),
    ("opus", PricingRate::new(5.0, 25.0, 6.25, 0.5)),
    ("haiku-4-5", PricingRate::new(1.0, 5.0, 1.25, 0.1)),
    ("3-5-haiku", PricingRate::new(0.8, 4.0, 1.0, 0.08)),
    ("3-haiku", PricingRate::new(0.25, 1.25, 0.3, 0.03)),
    ("haiku", PricingRate::new(1.0, 5.0, 1.25, 0.1)),
    ("sonnet", PricingRate::new(3.0, 15.0, 3.75, 0.3)),
    // OpenAI
    ("gpt-5-nano", PricingRate::new(0.05, 0.4, 0.0, 0.005)),
    ("gpt-5-mini", PricingRate::new(0.25, 2.0, 0.0, 0.025)),
    ("gpt-5", PricingRate::new(1.25, 10.0, 0.0, 0.125)),
    ("gpt-4-1-nano", PricingRate::new(0.1, 0.4, 0.0, 0.025)),
    ("gpt-4-1-mini", PricingRate::new(0.4, 1.6, 0.0, 0.1)),
    ("gpt-4-1", PricingRate::new(2.0, 8.0, 0.0, 0.5)),
    ("gpt-4o-mini", PricingRate::new(0.15, 0.6, 0.0, 0.075)),
    ("gpt-4o", PricingRate::new(2.5, 10.0, 0.0, 1.25)),
    ("o4-mini", PricingRate::new(1.1, 4.4, 0.0, 0.275)),
    ("o3-mini", PricingRate::new(1.1, 4.4, 0.0, 0.55)),
    ("o3", PricingRate::new(2.0, 8.0, 0.0, 0.5)),
    // Google
    ("gemini-2-5-pro", PricingRate::new(1.25, 10.0, 0.0, 0.31)),
    ("gemini-2-5-flash", PricingRate::new(0.3, 2.5, 0.0, 0.075)),
    ("gemini", PricingRate::new(0.3, 2.5, 0.0, 0.075)),
    // DeepSeek
    ("deepseek", PricingRate::new(0.27, 1.1, 0.0, 0.07)),
];

/// Substrings that mark an identifier as a real model name.
const VENDOR_MARKERS: &[&str] = &[
    "claude", "anthropic", "opus", "sonnet", "haiku", "gpt", "openai", "codex", "gemini",
    "deepseek", "qwen", "llama", "mistral", "grok", "kimi", "glm", "minimax",
];

/// OpenAI reasoning models only count when the name starts with these.
const O_SERIES_PREFIXES: &[&str] = &["o1", "o3", "o4"];

/// One row of the pricing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub pattern: String,
    #[serde(flatten)]
    pub rate: PricingRate,
}

/// Resolves model identifiers to rates. Built once per run, read-only afterwards.
#[derive(Debug, Clone)]
pub struct PricingResolver {
    rules: Vec<PricingRule>,
    default_rate: PricingRate,
}

impl Default for PricingResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingResolver {
    pub fn builtin() -> Self {
        Self::with_overrides(&[])
    }

    /// Builtin table with `overrides` checked first, in the order given.
    pub fn with_overrides(overrides: &[PricingRule]) -> Self {
        let rules = overrides
            .iter()
            .map(|rule| PricingRule {
                pattern: normalize_model(&rule.pattern),
                rate: rule.rate,
            })
            .chain(BUILTIN_RULES.iter().map(|(pattern, rate)| PricingRule {
                pattern: (*pattern).to_string(),
                rate: *rate,
            }))
            .collect();

        Self {
            rules,
            default_rate: DEFAULT_RATE,
        }
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    pub fn resolve(&self, model: &str) -> PricingRate {
        let mut normalized = normalize_model(model);
        if normalized.is_empty() {
            return self.default_rate;
        }
        // A bare `opus-4` is the first Opus 4 release
        if normalized.ends_with("opus-4") {
            normalized.push_str("-0");
        }
        self.rules
            .iter()
            .find(|rule| normalized.contains(rule.pattern.as_str()))
            .map(|rule| rule.rate)
            .unwrap_or(self.default_rate)
    }

    /// Cost of one event: the precomputed cost when the log carried one,
    /// otherwise tokens priced by the event's model.
    pub fn cost_of(&self, event: &UsageEvent) -> f64 {
        match event.precomputed_cost {
            Some(cost) => cost,
            None => self.resolve(&event.model).cost_of(event),
        }
    }
}

fn normalize_model(model: &str) -> String {
    model.trim().to_lowercase().replace(['.', '_'], "-")
}

/// Whether `model` names a model from a vendor we know, as opposed to a
/// placeholder such as `<synthetic>` or a tool name.
pub fn is_recognized_model(model: &str) -> bool {
    let lower = model.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    if VENDOR_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    O_SERIES_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(model: &str, input: u64, output: u64) -> UsageEvent {
        UsageEvent {
            model: model.to_string(),
            input_tokens: input,
            output_tokens: output,
            ..UsageEvent::default()
        }
    }

    #[test]
    fn test_unknown_and_empty_fall_back_to_sonnet() {
        let resolver = PricingResolver::builtin();
        assert_eq!(resolver.resolve(""), DEFAULT_RATE);
        assert_eq!(resolver.resolve("some-local-model"), DEFAULT_RATE);
    }

    #[test]
    fn test_versioned_opus_checked_before_family() {
        let resolver = PricingResolver::builtin();
        assert_eq!(resolver.resolve("claude-opus-4-6").input, 5.0);
        assert_eq!(resolver.resolve("claude-opus-4-1-20250805").input, 15.0);
        assert_eq!(resolver.resolve("claude-opus-4-20250514").output, 75.0);
        assert_eq!(resolver.resolve("claude-3-opus-20240229").input, 15.0);
        assert_eq!(resolver.resolve("anthropic/claude-opus-4").output, 75.0);
        assert_eq!(resolver.resolve("claude-opus-4").input, 15.0);
    }

    #[test]
    fn test_future_versions_use_family_rate() {
        let resolver = PricingResolver::builtin();
        let family = resolver.resolve("opus");
        assert_eq!(resolver.resolve("claude-opus-7"), family);
        assert_ne!(family, DEFAULT_RATE);
    }

    #[test]
    fn test_matching_is_case_insensitive_and_dot_tolerant() {
        let resolver = PricingResolver::builtin();
        assert_eq!(
            resolver.resolve("Claude-Opus-4.6"),
            resolver.resolve("claude-opus-4-6")
        );
        assert_eq!(resolver.resolve("GPT-4.1-mini").input, 0.4);
    }

    #[test]
    fn test_resolve_is_order_independent() {
        let resolver = PricingResolver::builtin();
        let first = resolver.resolve("claude-haiku-4-5");
        resolver.resolve("gpt-5");
        resolver.resolve("");
        assert_eq!(resolver.resolve("claude-haiku-4-5"), first);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let resolver = PricingResolver::with_overrides(&[PricingRule {
            pattern: "Sonnet-5".to_string(),
            rate: PricingRate::new(4.0, 20.0, 5.0, 0.4),
        }]);
        assert_eq!(resolver.resolve("claude-sonnet-5").input, 4.0);
        assert_eq!(resolver.resolve("claude-sonnet-4-5").input, 3.0);
    }

    #[test]
    fn test_cost_of_prefers_precomputed() {
        let resolver = PricingResolver::builtin();
        let mut usage = event("claude-sonnet-4-5", 3000, 500);
        let computed = resolver.cost_of(&usage);
        assert!((computed - 0.0165).abs() < 1e-12);

        usage.precomputed_cost = Some(0.5);
        assert_eq!(resolver.cost_of(&usage), 0.5);
    }

    #[test]
    fn test_recognized_models() {
        assert!(is_recognized_model("claude-sonnet-4-5"));
        assert!(is_recognized_model("openai/o3-mini"));
        assert!(is_recognized_model("gpt-5-codex"));
        assert!(!is_recognized_model("<synthetic>"));
        assert!(!is_recognized_model(""));
        assert!(!is_recognized_model("delivery-mirror"));
    }
}
