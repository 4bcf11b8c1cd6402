//! Endpoint descriptors: one named operation, its handler, and how its
//! payload is decoded.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use portico_core::schema::Validator;
use portico_core::Headers;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Payload + Handler
// ---------------------------------------------------------------------------

/// Decoded request payload handed to a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured payload: decoded JSON, or a plain string promoted to
    /// `Value::String` by the decoder's fallback.
    Value(Value),
    /// The exact inbound byte sequence (raw-bytes endpoints only).
    Bytes(Bytes),
}

impl Payload {
    /// Returns the structured value, if this payload is structured.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Bytes(_) => None,
        }
    }

    /// Returns the raw bytes, if this payload is raw.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Value(_) => None,
        }
    }
}

/// User-supplied operation handler.
///
/// The result may be produced synchronously or asynchronously; the dispatch
/// pipeline awaits the future either way. Returning `Err` maps to a generic
/// `500` envelope; panicking inside a handler is caught per message and maps
/// to the unknown-failure envelope. Neither can take the process down.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Processes one decoded request.
    ///
    /// # Errors
    ///
    /// Any error is absorbed by the pipeline and classified into an error
    /// envelope; it never propagates past the dispatch layer.
    async fn handle(&self, payload: Payload, headers: Headers) -> anyhow::Result<Value>;
}

/// Adapts an async closure into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Payload, Headers) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Payload, Headers) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, payload: Payload, headers: Headers) -> anyhow::Result<Value> {
        (self.0)(payload, headers).await
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// How an endpoint's inbound payload is decoded before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// JSON decoding with a plain-string fallback, then optional validation.
    #[default]
    Structured,
    /// The handler receives the exact inbound bytes; no decoding at all.
    RawBytes,
}

/// Immutable descriptor of one operation within a handler group.
///
/// Built with the builder methods below; frozen once its owning group is
/// constructed (groups store endpoints behind `Arc<[Endpoint]>`, so
/// append-after-freeze is impossible by construction).
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    handler: Arc<dyn Handler>,
    decode_mode: DecodeMode,
    validator: Option<Arc<dyn Validator>>,
    queue_override: Option<String>,
    metadata: HashMap<String, String>,
}

impl Endpoint {
    /// Creates a structured-mode endpoint with no validator, no queue
    /// override, and no metadata. An empty name is permitted.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
            decode_mode: DecodeMode::default(),
            validator: None,
            queue_override: None,
            metadata: HashMap::new(),
        }
    }

    /// Switches the endpoint to raw-bytes decoding.
    #[must_use]
    pub fn raw_bytes(mut self) -> Self {
        self.decode_mode = DecodeMode::RawBytes;
        self
    }

    /// Attaches a payload validator.
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Overrides the owning group's default queue for this endpoint.
    #[must_use]
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue_override = Some(queue.into());
        self
    }

    /// Adds one metadata entry, passed through to the transport binding for
    /// discovery. Never interpreted by the dispatch engine.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The endpoint name, unique within its owning group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler invoked for each decoded request.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// How the payload is decoded.
    #[must_use]
    pub const fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }

    /// The attached validator, if any.
    #[must_use]
    pub const fn validator_ref(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// The per-endpoint queue override, if any.
    #[must_use]
    pub const fn queue_override(&self) -> Option<&String> {
        self.queue_override.as_ref()
    }

    /// Discovery metadata, passed through to the transport untouched.
    #[must_use]
    pub const fn metadata_map(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("decode_mode", &self.decode_mode)
            .field("has_validator", &self.validator.is_some())
            .field("queue_override", &self.queue_override)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
