//! Inbound request validation
//!
//! Runs against the raw JSON body before it is converted into a typed
//! [`BuildRequest`](crate::types::BuildRequest), so a missing field is
//! reported by name instead of as a serde error.

use crate::errors::EngineError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Required top-level fields, checked in this order
pub const REQUIRED_FIELDS: [&str; 8] = [
    "email",
    "secret",
    "task",
    "round",
    "nonce",
    "brief",
    "checks",
    "evaluation_url",
];

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email pattern")
    })
}

/// Validate a raw build request body.
///
/// # Errors
///
/// Returns `EngineError::Validation` naming the first offending field.
pub fn validate_request(body: &Value) -> Result<(), EngineError> {
    let object = body
        .as_object()
        .ok_or_else(|| EngineError::validation("body", "Request body must be a JSON object"))?;

    for field in REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => {
                return Err(EngineError::validation(
                    field,
                    format!("Missing required field: {}", field),
                ));
            }
            Some(_) => {}
        }
    }

    let email_ok = object
        .get("email")
        .and_then(Value::as_str)
        .map(|email| email_pattern().is_match(email))
        .unwrap_or(false);
    if !email_ok {
        return Err(EngineError::validation("email", "Invalid email format"));
    }

    if !object.get("checks").map(Value::is_array).unwrap_or(false) {
        return Err(EngineError::validation("checks", "checks must be an array"));
    }

    match object.get("round").and_then(Value::as_u64) {
        Some(1) | Some(2) => {}
        _ => return Err(EngineError::validation("round", "round must be 1 or 2")),
    }

    let url_ok = object
        .get("evaluation_url")
        .and_then(Value::as_str)
        .map(is_absolute_url)
        .unwrap_or(false);
    if !url_ok {
        return Err(EngineError::validation(
            "evaluation_url",
            "Invalid evaluation_url",
        ));
    }

    Ok(())
}

/// True when `raw` parses as a URL with both a scheme and a host
pub fn is_absolute_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
