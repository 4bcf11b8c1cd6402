//! In-process [`Transport`] implementation backed by [`DashMap`].
//!
//! Subjects map to binding lists; queue groups deliver each request to one
//! member per label (round-robin), while label-less bindings all receive it.
//! Suitable for tests and single-process embedding; the semantics match
//! what a networked pub/sub transport provides, minus the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use portico_core::Headers;
use tokio::sync::mpsc;

use super::{
    Delivery, DeliveryError, EndpointBinding, InboundMessage, MessageHandler, ReplyAddress,
    Transport, TransportGroup,
};

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

/// In-process transport: a subject table plus queue-group selection.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subjects: DashMap<String, SubjectState>,
    /// How many times `add_group` was called per name; lets tests assert
    /// the engine's lazy binding creates each group exactly once.
    add_group_calls: DashMap<String, usize>,
    stopped: AtomicBool,
    closed: AtomicBool,
}

#[derive(Default)]
struct SubjectState {
    bindings: Vec<StoredBinding>,
    /// Round-robin cursor per queue label.
    cursors: HashMap<String, usize>,
}

struct StoredBinding {
    queue: Option<String>,
    metadata: HashMap<String, String>,
    handler: MessageHandler,
}

/// Queue and metadata of one bound subscription, for introspection.
#[derive(Debug, Clone)]
pub struct BindingInfo {
    /// Effective queue label the binding was registered with.
    pub queue: Option<String>,
    /// Discovery metadata, exactly as passed through the engine.
    pub metadata: HashMap<String, String>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a request and waits for the first reply envelope.
    ///
    /// Returns `None` when the subject has no subscribers, when the
    /// transport is stopped, or when no selected subscriber replied.
    pub async fn request(
        &self,
        subject: &str,
        payload: impl Into<Bytes>,
        headers: Headers,
    ) -> Option<Vec<u8>> {
        let message = InboundMessage {
            payload: payload.into(),
            headers,
        };
        self.deliver(subject, Ok(message), true).await
    }

    /// Publishes without a reply address: the pipeline runs, nothing is
    /// sent back.
    pub async fn publish(&self, subject: &str, payload: impl Into<Bytes>, headers: Headers) {
        let message = InboundMessage {
            payload: payload.into(),
            headers,
        };
        self.deliver(subject, Ok(message), false).await;
    }

    /// Synthesizes a per-message delivery error on the subject, as a real
    /// transport would surface a failed delivery, and waits for the reply.
    pub async fn deliver_error(&self, subject: &str, error: DeliveryError) -> Option<Vec<u8>> {
        self.deliver(subject, Err(error), true).await
    }

    async fn deliver(
        &self,
        subject: &str,
        message: Result<InboundMessage, DeliveryError>,
        want_reply: bool,
    ) -> Option<Vec<u8>> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return None;
        }
        // Selection happens under the map guard; handler futures are awaited
        // after the guard is dropped.
        let handlers = self.select(subject)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        for handler in handlers {
            let reply: Option<Box<dyn ReplyAddress>> = if want_reply {
                Some(Box::new(MemoryReply { tx: tx.clone() }))
            } else {
                None
            };
            let delivery = Delivery {
                message: message.clone(),
                reply,
            };
            handler(delivery).await;
        }
        drop(tx);
        rx.recv().await
    }

    /// Picks the receiving bindings: every label-less binding, plus one
    /// member per queue label, rotating the label's cursor.
    fn select(&self, subject: &str) -> Option<Vec<MessageHandler>> {
        let mut state = self.inner.subjects.get_mut(subject)?;
        if state.bindings.is_empty() {
            return None;
        }

        let mut selected = Vec::new();
        let mut members: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, binding) in state.bindings.iter().enumerate() {
            match &binding.queue {
                None => selected.push(Arc::clone(&binding.handler)),
                Some(label) => members.entry(label.clone()).or_default().push(index),
            }
        }
        for (label, indexes) in members {
            let cursor = state.cursors.entry(label).or_insert(0);
            let pick = indexes[*cursor % indexes.len()];
            *cursor += 1;
            selected.push(Arc::clone(&state.bindings[pick].handler));
        }
        Some(selected)
    }

    /// How many times `add_group` was called for `name`.
    #[must_use]
    pub fn add_group_calls(&self, name: &str) -> usize {
        self.inner
            .add_group_calls
            .get(name)
            .map_or(0, |entry| *entry.value())
    }

    /// Number of bindings registered under a full subject.
    #[must_use]
    pub fn endpoint_count(&self, subject: &str) -> usize {
        self.inner
            .subjects
            .get(subject)
            .map_or(0, |state| state.bindings.len())
    }

    /// Queue and metadata of every binding under a subject, in bind order.
    #[must_use]
    pub fn bindings(&self, subject: &str) -> Vec<BindingInfo> {
        self.inner.subjects.get(subject).map_or_else(Vec::new, |state| {
            state
                .bindings
                .iter()
                .map(|binding| BindingInfo {
                    queue: binding.queue.clone(),
                    metadata: binding.metadata.clone(),
                })
                .collect()
        })
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Group = MemoryGroup;

    async fn add_group(&self, name: &str) -> anyhow::Result<Self::Group> {
        *self
            .inner
            .add_group_calls
            .entry(name.to_string())
            .or_insert(0) += 1;
        Ok(MemoryGroup {
            name: name.to_string(),
            inner: Arc::clone(&self.inner),
        })
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.inner.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryGroup + MemoryReply
// ---------------------------------------------------------------------------

/// Group handle scoping endpoint binds under `{group}.{endpoint}` subjects.
pub struct MemoryGroup {
    name: String,
    inner: Arc<Inner>,
}

#[async_trait]
impl TransportGroup for MemoryGroup {
    async fn add_endpoint(&self, name: &str, binding: EndpointBinding) -> anyhow::Result<()> {
        let subject = format!("{}.{name}", self.name);
        self.inner
            .subjects
            .entry(subject)
            .or_default()
            .bindings
            .push(StoredBinding {
                queue: binding.queue,
                metadata: binding.metadata,
                handler: binding.handler,
            });
        Ok(())
    }
}

struct MemoryReply {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl ReplyAddress for MemoryReply {
    async fn publish(self: Box<Self>, body: Vec<u8>) {
        // The requester may be gone; replying never raises.
        let _ = self.tx.send(body);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Handler that counts invocations and echoes a fixed body.
    fn counting_handler(counter: Arc<AtomicUsize>, body: &'static [u8]) -> MessageHandler {
        Arc::new(move |delivery: Delivery| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(reply) = delivery.reply {
                    reply.publish(body.to_vec()).await;
                }
            })
        })
    }

    async fn bind(
        transport: &MemoryTransport,
        group: &str,
        endpoint: &str,
        queue: Option<&str>,
        handler: MessageHandler,
    ) {
        let group = transport.add_group(group).await.unwrap();
        group
            .add_endpoint(
                endpoint,
                EndpointBinding {
                    queue: queue.map(str::to_string),
                    metadata: HashMap::new(),
                    handler,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn request_with_no_subscribers_returns_none() {
        let transport = MemoryTransport::new();
        let reply = transport.request("math.add", "{}", Headers::new()).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn queue_group_delivers_to_exactly_one_member() {
        let transport = MemoryTransport::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        bind(
            &transport,
            "math",
            "add",
            Some("workers"),
            counting_handler(Arc::clone(&first), b"1"),
        )
        .await;
        bind(
            &transport,
            "math",
            "add",
            Some("workers"),
            counting_handler(Arc::clone(&second), b"2"),
        )
        .await;

        for _ in 0..4 {
            transport.request("math.add", "{}", Headers::new()).await;
        }
        // Round-robin: two each, never both per request.
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unqueued_bindings_all_receive() {
        let transport = MemoryTransport::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        bind(
            &transport,
            "audit",
            "event",
            None,
            counting_handler(Arc::clone(&first), b"1"),
        )
        .await;
        bind(
            &transport,
            "audit",
            "event",
            None,
            counting_handler(Arc::clone(&second), b"2"),
        )
        .await;

        transport.publish("audit.event", "{}", Headers::new()).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn binding_metadata_is_stored_verbatim() {
        let transport = MemoryTransport::new();
        let group = transport.add_group("math").await.unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("team".to_string(), "billing".to_string());
        group
            .add_endpoint(
                "add",
                EndpointBinding {
                    queue: Some("q".to_string()),
                    metadata: metadata.clone(),
                    handler: counting_handler(Arc::new(AtomicUsize::new(0)), b"x"),
                },
            )
            .await
            .unwrap();

        let info = transport.bindings("math.add");
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].queue.as_deref(), Some("q"));
        assert_eq!(info[0].metadata, metadata);
    }

    #[tokio::test]
    async fn stopped_transport_drops_requests() {
        let transport = MemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bind(
            &transport,
            "math",
            "add",
            None,
            counting_handler(Arc::clone(&counter), b"1"),
        )
        .await;

        transport.stop().await.unwrap();
        let reply = transport.request("math.add", "{}", Headers::new()).await;
        assert!(reply.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(transport.is_stopped());
    }

    #[tokio::test]
    async fn handler_that_never_replies_yields_none() {
        let transport = MemoryTransport::new();
        let silent: MessageHandler =
            Arc::new(|_delivery: Delivery| Box::pin(async {}));
        bind(&transport, "void", "sink", None, silent).await;

        let reply = transport.request("void.sink", "{}", Headers::new()).await;
        assert!(reply.is_none());
    }
}
