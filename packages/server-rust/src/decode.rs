//! Message decoding: raw inbound bytes to the value a handler receives.
//!
//! Structured endpoints try JSON first and fall back to a plain string —
//! many producers send bare commands like `"ping"`, and rejecting them for
//! not being JSON would break the common case. Raw-bytes endpoints skip
//! decoding entirely.

use bytes::Bytes;
use serde_json::Value;

use crate::endpoint::{DecodeMode, Endpoint, Payload};
use crate::error::RequestFailure;

/// Decodes (and, when configured, validates) one inbound payload.
///
/// Raw-bytes endpoints receive the exact original byte sequence and skip
/// validation: there is no structured value to validate. Structured
/// endpoints get the JSON value, or the payload promoted to a JSON string
/// when it is not valid JSON, then the validator's (possibly transformed)
/// output.
///
/// # Errors
///
/// Returns [`RequestFailure::Validation`] when the endpoint's validator
/// rejects the decoded value. Decoding itself cannot fail: when the target
/// is `Value`, `serde_json` only reports syntax/EOF errors, and those are
/// exactly the not-JSON case the string fallback covers.
pub async fn decode(endpoint: &Endpoint, payload: &Bytes) -> Result<Payload, RequestFailure> {
    if endpoint.decode_mode() == DecodeMode::RawBytes {
        return Ok(Payload::Bytes(payload.clone()));
    }

    let decoded = serde_json::from_slice::<Value>(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()));

    match endpoint.validator_ref() {
        Some(validator) => match validator.validate(decoded).await {
            Ok(value) => Ok(Payload::Value(value)),
            Err(issues) => Err(RequestFailure::Validation(issues)),
        },
        None => Ok(Payload::Value(decoded)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
