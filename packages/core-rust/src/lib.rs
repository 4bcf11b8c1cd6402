//! Portico Core — reply envelopes, schema validation, and shared wire types.

pub mod envelope;
pub mod schema;
pub mod types;

pub use envelope::{ErrorReply, Reply, SuccessReply};
pub use schema::{FieldDef, FieldIssue, FieldKind, MessageSchema, Validator};
pub use types::Headers;
