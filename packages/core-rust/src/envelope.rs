//! Reply envelope: the two canonical JSON shapes every request is answered
//! with.
//!
//! Every dispatched request produces exactly one of:
//!
//! ```json
//! {"error": false, "data": <any>}
//! {"error": true, "message": "<string>", "code": "<string>", "details": <any>}
//! ```
//!
//! `details` is omitted entirely (not serialized as `null`) when absent, so
//! callers can distinguish "no detail disclosed" from "detail is null".
//! The `error` discriminant is private and pinned per shape: only
//! [`Reply::success`] and [`ErrorReply::new`] can build envelopes, and
//! parsing rejects a mismatched discriminant.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Discriminant enforcement
// ---------------------------------------------------------------------------

/// Accepts only `error: false`; the success shape cannot claim to be an
/// error.
fn false_only<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    if bool::deserialize(deserializer)? {
        Err(serde::de::Error::custom("success envelope with error: true"))
    } else {
        Ok(false)
    }
}

/// Accepts only `error: true`.
fn true_only<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    if bool::deserialize(deserializer)? {
        Ok(true)
    } else {
        Err(serde::de::Error::custom("error envelope with error: false"))
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// A wire-level reply, either shape.
///
/// Serialization is untagged: the two variants are distinguished by their
/// field sets (`data` vs `message`/`code`) and by the pinned `error`
/// discriminant, which never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Successful handler result.
    Success(SuccessReply),
    /// Classified failure.
    Failure(ErrorReply),
}

/// Success-shaped reply body. Constructed only via [`Reply::success`], so
/// the discriminant is always `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessReply {
    #[serde(deserialize_with = "false_only")]
    error: bool,
    /// The handler's return value, verbatim.
    pub data: Value,
}

/// Error-shaped reply body produced by the classifier. The discriminant is
/// always `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(deserialize_with = "true_only")]
    error: bool,
    /// Human-readable message. Fixed literals for internal failures so no
    /// internals leak through the message field.
    pub message: String,
    /// String status code, e.g. `"400"` or `"500"`.
    pub code: String,
    /// Optional structured detail. Validation issues are always present;
    /// everything else is development-mode only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<Value>,
}

impl Reply {
    /// Wraps a handler result in the success shape.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self::Success(SuccessReply { error: false, data })
    }

    /// Wraps classified error fields in the failure shape.
    #[must_use]
    pub fn failure(reply: ErrorReply) -> Self {
        Self::Failure(reply)
    }

    /// Whether this reply is error-shaped.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Serializes the envelope to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails, which cannot happen for
    /// envelopes built from `serde_json::Value` data.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses an envelope from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not one of the two canonical
    /// shapes, including a shape whose `error` discriminant contradicts its
    /// fields.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl ErrorReply {
    /// Builds an error reply with `error: true` pre-set.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            error: true,
            message: message.into(),
            code: code.into(),
            details,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_serializes_with_error_false() {
        let reply = Reply::success(json!(8));
        let bytes = reply.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"error": false, "data": 8}));
    }

    #[test]
    fn failure_without_details_omits_the_field() {
        let reply = Reply::failure(ErrorReply::new("500", "Internal Server Error", None));
        let bytes = reply.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({"error": true, "message": "Internal Server Error", "code": "500"})
        );
        assert!(value.get("details").is_none());
    }

    #[test]
    fn failure_with_details_preserves_them() {
        let details = json!([{"path": "secondNumber", "message": "expected number"}]);
        let reply = Reply::failure(ErrorReply::new(
            "400",
            "Bad Request: Validation failed.",
            Some(details.clone()),
        ));
        let bytes = reply.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["details"], details);
    }

    #[test]
    fn round_trip_distinguishes_variants() {
        let success = Reply::success(json!({"a": 1}));
        let parsed = Reply::from_bytes(&success.to_bytes().unwrap()).unwrap();
        assert!(matches!(parsed, Reply::Success(_)));
        assert!(!parsed.is_error());

        let failure = Reply::failure(ErrorReply::new("400", "bad", None));
        let parsed = Reply::from_bytes(&failure.to_bytes().unwrap()).unwrap();
        assert!(parsed.is_error());
    }

    #[test]
    fn contradictory_discriminants_are_rejected() {
        // Success fields claiming to be an error, and vice versa: neither
        // is one of the two canonical shapes.
        assert!(Reply::from_bytes(br#"{"error":true,"data":8}"#).is_err());
        assert!(Reply::from_bytes(br#"{"error":false,"message":"m","code":"500"}"#).is_err());
    }
}
