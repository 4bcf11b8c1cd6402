//! Transport boundary: the entire contract the dispatch engine consumes
//! from the underlying pub/sub system.
//!
//! A transport provides named group handles ([`Transport::add_group`]);
//! each handle binds per-endpoint subscriptions with an optional queue
//! group and discovery metadata ([`TransportGroup::add_endpoint`]). The
//! dispatch engine depends on nothing else — reconnection, heartbeats, and
//! discovery advertising are the transport's own business.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use portico_core::Headers;

// ---------------------------------------------------------------------------
// Per-message types
// ---------------------------------------------------------------------------

/// A successfully delivered inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Raw payload bytes, exactly as published.
    pub payload: Bytes,
    /// Headers, empty when the message carried none.
    pub headers: Headers,
}

/// A per-message delivery error reported by the transport in place of a
/// message. Not a decode or handler error: the handler is never invoked.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DeliveryError {
    /// Transport-supplied status code; the classifier defaults to `"500"`.
    pub code: Option<String>,
    /// Transport-supplied message, echoed into the envelope.
    pub message: String,
}

/// The reply address of an inbound request.
///
/// `publish` is infallible by contract: replying must never raise, so a
/// transport that fails to publish absorbs (and logs) the failure itself.
#[async_trait]
pub trait ReplyAddress: Send {
    /// Publishes the reply body to the requester.
    async fn publish(self: Box<Self>, body: Vec<u8>);
}

/// One unit of inbound work handed to a wrapped endpoint handler:
/// either a message or a delivery error, plus an optional reply address.
/// Messages without a reply address still run the full pipeline; the final
/// publish is simply skipped.
pub struct Delivery {
    /// The message, or the transport's per-message delivery error.
    pub message: Result<InboundMessage, DeliveryError>,
    /// Where to send the reply envelope, when the requester wants one.
    pub reply: Option<Box<dyn ReplyAddress>>,
}

/// Future returned by a wrapped endpoint handler.
pub type MessageFuture = BoxFuture<'static, ()>;

/// The wrapped per-endpoint handler installed into a transport binding.
/// Invoked once per delivery; always completes without panicking.
pub type MessageHandler = Arc<dyn Fn(Delivery) -> MessageFuture + Send + Sync>;

/// Everything a transport needs to bind one endpoint subscription.
pub struct EndpointBinding {
    /// Effective queue group (endpoint override or group default), if any.
    pub queue: Option<String>,
    /// Discovery metadata, passed through untouched.
    pub metadata: HashMap<String, String>,
    /// The wrapped dispatch pipeline for this endpoint.
    pub handler: MessageHandler,
}

// ---------------------------------------------------------------------------
// Transport traits
// ---------------------------------------------------------------------------

/// A pub/sub transport with request-reply semantics and queue groups.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The transport-level group handle created per group name.
    type Group: TransportGroup;

    /// Creates (or advertises) a named group and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot create the group.
    async fn add_group(&self, name: &str) -> anyhow::Result<Self::Group>;

    /// Stops serving: unbinds subscriptions and drains in-flight work.
    ///
    /// # Errors
    ///
    /// Returns an error if draining fails.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Closes the underlying connection. Called after [`Transport::stop`].
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be closed cleanly.
    async fn close(&self) -> anyhow::Result<()>;
}

/// A transport-level group handle; binds endpoint subscriptions scoped under
/// the group's name.
#[async_trait]
pub trait TransportGroup: Send + Sync + 'static {
    /// Binds one endpoint subscription. Visible to discovery immediately;
    /// there is no unbind short of [`Transport::stop`].
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    async fn add_endpoint(&self, name: &str, binding: EndpointBinding) -> anyhow::Result<()>;
}
