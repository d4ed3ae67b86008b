//! # Token Extraction
//!
//! Resolves a usage object into [`TokenCounts`]. Writers disagree on layout:
//! usage may sit at the record's top level or under `message`, and cache
//! creation may be a direct count or a nested object keyed by cache lifetime.
//! Each quantity is taken from exactly one representation, in priority order.

use serde_json::Value;

use crate::models::{TokenCounts, TranscriptLine};

const CACHE_CREATE_DIRECT: &str = "cache_creation_input_tokens";
const CACHE_READ_DIRECT: &str = "cache_read_input_tokens";
const CACHE_CREATE_NESTED: &str = "cache_creation";
const CACHE_READ_NESTED: &str = "cache_read";
const CACHE_CREATE_CAMEL: [&str; 2] = ["cacheCreationInputTokens", "cacheCreationTokens"];
const CACHE_READ_CAMEL: [&str; 2] = ["cacheReadInputTokens", "cacheReadTokens"];
const EPHEMERAL_WINDOWS: [&str; 2] = ["ephemeral_5m_input_tokens", "ephemeral_1h_input_tokens"];

/// Non-negative integer count; tolerates writers that emit `12.0`
fn as_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    match v.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 => Some(f.round() as u64),
        _ => None,
    }
}

fn count_field(usage: &Value, key: &str) -> Option<u64> {
    usage.get(key).and_then(as_count)
}

/// Sum of the ephemeral-window counts inside a nested cache object.
/// `None` when the object is missing or carries no recognised window.
fn nested_count(usage: &Value, key: &str) -> Option<u64> {
    let obj = usage.get(key)?.as_object()?;
    let mut found = false;
    let mut sum = 0u64;
    for window in EPHEMERAL_WINDOWS {
        if let Some(n) = obj.get(window).and_then(as_count) {
            found = true;
            sum = sum.saturating_add(n);
        }
    }
    if found { Some(sum) } else { None }
}

/// Resolve one cache quantity: direct field, then nested object, then the
/// camelCase spellings. A present direct value wins even when it is zero.
fn cache_count(usage: &Value, direct: &str, nested: &str, camel: &[&str]) -> u64 {
    if let Some(n) = count_field(usage, direct) {
        return n;
    }
    if let Some(n) = nested_count(usage, nested) {
        return n;
    }
    for key in camel {
        if let Some(n) = count_field(usage, key) {
            return n;
        }
    }
    0
}

/// Per-category counts of one usage object
pub fn extract_counts(usage: &Value) -> TokenCounts {
    TokenCounts {
        input: count_field(usage, "input_tokens").unwrap_or(0),
        output: count_field(usage, "output_tokens").unwrap_or(0),
        cache_create: cache_count(
            usage,
            CACHE_CREATE_DIRECT,
            CACHE_CREATE_NESTED,
            &CACHE_CREATE_CAMEL,
        ),
        cache_read: cache_count(usage, CACHE_READ_DIRECT, CACHE_READ_NESTED, &CACHE_READ_CAMEL),
    }
}

/// Canonical token total of a usage object; 0 for missing or null usage
pub fn extract_tokens(usage: Option<&Value>) -> u64 {
    match usage {
        Some(u) if u.is_object() => extract_counts(u).total(),
        _ => 0,
    }
}

/// The usage object of a line: top level first, then `message.usage`.
/// Null and empty objects count as absent.
pub fn usage_value(line: &TranscriptLine) -> Option<&Value> {
    let present = |v: &&Value| v.as_object().is_some_and(|o| !o.is_empty());
    line.usage.as_ref().filter(present).or_else(|| {
        line.message
            .as_ref()
            .and_then(|m| m.get("usage"))
            .filter(present)
    })
}

/// Resolved counts of a line, `None` when it carries no usage
pub fn line_usage(line: &TranscriptLine) -> Option<TokenCounts> {
    usage_value(line).map(extract_counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sums_all_direct_fields() {
        let u = json!({
            "input_tokens": 10,
            "output_tokens": 20,
            "cache_creation_input_tokens": 30,
            "cache_read_input_tokens": 40
        });
        assert_eq!(extract_tokens(Some(&u)), 100);
    }

    #[test]
    fn direct_and_nested_cache_creation_are_not_double_counted() {
        let both = json!({
            "input_tokens": 5,
            "output_tokens": 5,
            "cache_creation_input_tokens": 500,
            "cache_creation": {"ephemeral_5m_input_tokens": 500}
        });
        let direct_only = json!({
            "input_tokens": 5,
            "output_tokens": 5,
            "cache_creation_input_tokens": 500
        });
        assert_eq!(extract_tokens(Some(&both)), extract_tokens(Some(&direct_only)));
        assert_eq!(extract_tokens(Some(&both)), 510);
    }

    #[test]
    fn direct_zero_is_authoritative() {
        let u = json!({
            "cache_creation_input_tokens": 0,
            "cache_creation": {"ephemeral_5m_input_tokens": 900}
        });
        assert_eq!(extract_counts(&u).cache_create, 0);
    }

    #[test]
    fn nested_is_used_when_direct_missing() {
        let u = json!({
            "input_tokens": 1,
            "cache_creation": {
                "ephemeral_5m_input_tokens": 70,
                "ephemeral_1h_input_tokens": 30
            },
            "cache_read": {"ephemeral_5m_input_tokens": 9}
        });
        let c = extract_counts(&u);
        assert_eq!(c.cache_create, 100);
        assert_eq!(c.cache_read, 9);
    }

    #[test]
    fn camel_case_spellings_are_last_resort() {
        let u = json!({"cacheReadInputTokens": 12, "cacheCreationTokens": 4});
        let c = extract_counts(&u);
        assert_eq!(c.cache_read, 12);
        assert_eq!(c.cache_create, 4);
    }

    #[test]
    fn missing_or_null_usage_is_zero() {
        assert_eq!(extract_tokens(None), 0);
        assert_eq!(extract_tokens(Some(&Value::Null)), 0);
    }

    #[test]
    fn usage_falls_back_to_message_object() {
        let line: TranscriptLine = serde_json::from_value(json!({
            "type": "assistant",
            "message": {"id": "m1", "usage": {"input_tokens": 3, "output_tokens": 4}}
        }))
        .unwrap();
        assert_eq!(line_usage(&line).map(|c| c.total()), Some(7));

        let top: TranscriptLine = serde_json::from_value(json!({
            "type": "assistant",
            "usage": {"input_tokens": 1},
            "message": {"usage": {"input_tokens": 50}}
        }))
        .unwrap();
        assert_eq!(line_usage(&top).map(|c| c.total()), Some(1));
    }

    #[test]
    fn empty_usage_object_is_absent() {
        let line: TranscriptLine =
            serde_json::from_value(json!({"type": "assistant", "usage": {}})).unwrap();
        assert!(line_usage(&line).is_none());
    }
}
