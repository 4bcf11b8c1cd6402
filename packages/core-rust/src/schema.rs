//! Payload validation: the pluggable [`Validator`] capability and a
//! field-schema implementation of it.
//!
//! Validation has a binary outcome: a (possibly transformed) value, or a
//! list of field-level issues. The dispatch layer treats the capability as
//! opaque; [`MessageSchema`] is the stock implementation for flat JSON
//! object payloads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// FieldIssue + Validator
// ---------------------------------------------------------------------------

/// A single field-level validation problem.
///
/// Issues are disclosed to callers verbatim (they describe the caller's own
/// malformed input), so messages must never reference server internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Path of the offending field, e.g. `"secondNumber"`. Empty for issues
    /// about the payload as a whole.
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldIssue {
    /// Builds an issue for the given path.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Pluggable payload validator.
///
/// `validate` either accepts the value (possibly transforming it, e.g.
/// stripping unknown fields or applying defaults) or rejects it with a
/// non-empty issue list. Implementations may be asynchronous; the dispatch
/// pipeline awaits them per message.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Checks `value`, returning the value to hand to the handler.
    ///
    /// # Errors
    ///
    /// Returns the list of field-level issues when the value is rejected.
    async fn validate(&self, value: Value) -> Result<Value, Vec<FieldIssue>>;
}

// ---------------------------------------------------------------------------
// MessageSchema
// ---------------------------------------------------------------------------

/// Expected JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Number,
    String,
    Boolean,
    Object,
    Array,
    /// Any JSON value, including null. Only presence is checked.
    Any,
}

impl FieldKind {
    /// Wire-facing name used in issue messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }
}

/// Single field definition within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Name of the field.
    pub name: String,
    /// Expected JSON type.
    pub kind: FieldKind,
    /// Whether the field must be present in every payload.
    pub required: bool,
}

/// Flat field schema for JSON object payloads.
///
/// Checks that the payload is an object, that every required field is
/// present, and that every present field has the expected JSON type.
/// Unknown fields pass through untouched; the value is returned unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSchema {
    /// Field definitions, checked in declaration order.
    pub fields: Vec<FieldDef>,
}

impl MessageSchema {
    /// Creates an empty schema (accepts any JSON object).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Adds an optional field; checked only when present.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    fn check(&self, value: &Value) -> Vec<FieldIssue> {
        let Some(object) = value.as_object() else {
            return vec![FieldIssue::new("", "expected a JSON object payload")];
        };

        let mut issues = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                Some(present) if !field.kind.matches(present) => {
                    issues.push(FieldIssue::new(
                        field.name.clone(),
                        format!("expected {}", field.kind.name()),
                    ));
                }
                Some(_) => {}
                None if field.required => {
                    issues.push(FieldIssue::new(field.name.clone(), "required field is missing"));
                }
                None => {}
            }
        }
        issues
    }
}

#[async_trait]
impl Validator for MessageSchema {
    async fn validate(&self, value: Value) -> Result<Value, Vec<FieldIssue>> {
        let issues = self.check(&value);
        if issues.is_empty() {
            Ok(value)
        } else {
            Err(issues)
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

    fn two_number_schema() -> MessageSchema {
        MessageSchema::new()
            .required("firstNumber", FieldKind::Number)
            .required("secondNumber", FieldKind::Number)
    }

    #[tokio::test]
    async fn conforming_object_passes_unchanged() {
        let input = json!({"firstNumber": 10, "secondNumber": 2});
        let out = two_number_schema().validate(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn type_mismatch_names_the_field() {
        let input = json!({"firstNumber": 10, "secondNumber": true});
        let issues = two_number_schema().validate(input).await.unwrap_err();
        assert!(issues.iter().any(|issue| issue.path == "secondNumber"));
    }

    #[tokio::test]
    async fn missing_required_field_is_reported() {
        let issues = two_number_schema()
            .validate(json!({"firstNumber": 1}))
            .await
            .unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "secondNumber");
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected_wholesale() {
        let issues = two_number_schema()
            .validate(json!("hello"))
            .await
            .unwrap_err();
        assert_eq!(issues[0].path, "");
    }

    #[tokio::test]
    async fn optional_field_checked_only_when_present() {
        let schema = MessageSchema::new().optional("note", FieldKind::String);
        assert!(schema.validate(json!({})).await.is_ok());
        assert!(schema.validate(json!({"note": 5})).await.is_err());
    }

    #[tokio::test]
    async fn unknown_fields_pass_through() {
        let schema = MessageSchema::new().required("a", FieldKind::Number);
        let input = json!({"a": 1, "extra": "kept"});
        let out = schema.validate(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }
}
