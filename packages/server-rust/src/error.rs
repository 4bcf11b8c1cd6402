//! Error taxonomy for the dispatch layer.
//!
//! Only [`GroupError`] and [`RegistrationError`] ever surface to the
//! registering caller. [`RequestFailure`] is per-message and always absorbed
//! by the pipeline into an error envelope — a single message can never take
//! the service down.

use portico_core::schema::FieldIssue;
use uuid::Uuid;

use crate::transport::DeliveryError;

/// Construction-time configuration errors. Fatal to the call, never reach a
/// message reply.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// Two endpoints in one group share a name. Rejected at construction so
    /// a subject is never bound twice within a group.
    #[error("duplicate endpoint name {name:?} in group {group:?}")]
    DuplicateEndpoint {
        /// The owning group's name.
        group: String,
        /// The colliding endpoint name.
        name: String,
    },
}

/// Registration-time errors surfaced by `App::register_group`.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The exact same group instance was registered before. Two distinct
    /// instances may share a group name; the same instance may not be bound
    /// twice.
    #[error("group instance {identity} is already registered")]
    DuplicateGroup {
        /// The group instance identity.
        identity: Uuid,
    },
    /// A transport-level bind call failed. Binds are best-effort and
    /// non-transactional: endpoints bound before the failure stay bound.
    #[error("transport binding failed: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Per-message failure, classified into an error envelope and replied to the
/// requester. Ordering of the variants mirrors classification precedence.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    /// The payload failed validation. Always answered with code `"400"` and
    /// the full issue list.
    #[error("payload validation failed with {} issue(s)", .0.len())]
    Validation(Vec<FieldIssue>),
    /// The transport reported a per-message delivery error; the handler was
    /// never invoked.
    #[error("transport delivery error: {0}")]
    Delivery(DeliveryError),
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Handler(anyhow::Error),
    /// The handler panicked; the payload is the rendered panic value.
    #[error("handler panicked: {0}")]
    Panic(String),
}
