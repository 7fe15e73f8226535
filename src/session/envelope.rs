//! Human-readable detail extraction from session error envelopes
//!
//! The session endpoint (and whatever proxies it) reports failures in several
//! shapes. Candidates are checked in order:
//! 1. `{"error": "..."}`
//! 2. `{"error": {"message": "..."}}`
//! 3. `{"details": "..."}`
//! 4. `{"details": {"error": "..."}}` or `{"details": {"error": {"message": "..."}}}`
//! 5. `{"message": "..."}`
//!
//! and the fallback (usually the HTTP status text) is used otherwise.

use serde_json::Value;

fn string_or_message(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("message").and_then(Value::as_str),
        _ => None,
    }
}

/// Pick the most specific error detail from a decoded response body
pub fn extract_error_detail(payload: &Value, fallback: &str) -> String {
    let detail = payload
        .get("error")
        .and_then(string_or_message)
        .or_else(|| match payload.get("details") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(details)) => details.get("error").and_then(string_or_message),
            _ => None,
        })
        .or_else(|| payload.get("message").and_then(Value::as_str));

    detail.unwrap_or(fallback).to_string()
}
