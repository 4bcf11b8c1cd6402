//! Failure classification: maps a [`RequestFailure`] to the error fields of
//! a reply envelope.
//!
//! Validation issues describe the caller's own malformed input and are
//! always disclosed. Every other detail is an internals leak and is
//! redacted outside development mode; only the fixed literals and status
//! codes go out.

use serde_json::{json, Value};

use portico_core::envelope::ErrorReply;
use portico_core::schema::FieldIssue;

use crate::error::RequestFailure;

/// Fixed message for validation failures.
pub const VALIDATION_MESSAGE: &str = "Bad Request: Validation failed.";
/// Fixed message for handler errors.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";
/// Fixed message for non-error failures (handler panics).
pub const UNKNOWN_MESSAGE: &str = "An unknown internal error occurred.";

/// Classifies a failure into envelope error fields. State-free; first match
/// in the [`RequestFailure`] variant order wins.
#[must_use]
pub fn classify(failure: &RequestFailure, dev_mode: bool) -> ErrorReply {
    match failure {
        RequestFailure::Validation(issues) => ErrorReply::new(
            "400",
            VALIDATION_MESSAGE,
            // Never dev-gated: the issues describe the caller's input.
            Some(issues_to_value(issues)),
        ),
        RequestFailure::Delivery(error) => ErrorReply::new(
            error.code.clone().unwrap_or_else(|| "500".to_string()),
            error.message.clone(),
            dev_mode.then(|| {
                json!({
                    "name": "DeliveryError",
                    "message": error.message,
                })
            }),
        ),
        RequestFailure::Handler(error) => ErrorReply::new(
            "500",
            INTERNAL_MESSAGE,
            dev_mode.then(|| {
                // The error chain stands in for a stack trace.
                let chain: Vec<String> =
                    error.chain().skip(1).map(ToString::to_string).collect();
                json!({
                    "name": "HandlerFailure",
                    "message": error.to_string(),
                    "chain": chain,
                })
            }),
        ),
        RequestFailure::Panic(rendered) => ErrorReply::new(
            "500",
            UNKNOWN_MESSAGE,
            dev_mode.then(|| Value::String(rendered.clone())),
        ),
    }
}

fn issues_to_value(issues: &[FieldIssue]) -> Value {
    Value::Array(
        issues
            .iter()
            .map(|issue| json!({"path": issue.path, "message": issue.message}))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
