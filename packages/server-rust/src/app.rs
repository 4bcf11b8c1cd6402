//! The dispatch engine: owns registered groups, binds their endpoints to
//! the transport, and wraps every endpoint with the full
//! receive → decode → validate → invoke → encode → reply pipeline.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use portico_core::envelope::Reply;

use crate::classify::classify;
use crate::config::DispatchConfig;
use crate::decode::decode;
use crate::endpoint::Endpoint;
use crate::error::{RegistrationError, RequestFailure};
use crate::group::HandlerGroup;
use crate::transport::{
    Delivery, EndpointBinding, InboundMessage, MessageHandler, Transport, TransportGroup,
};

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Dispatch engine and group registry.
///
/// Group bindings are created lazily: the first registration of a group
/// name creates the transport-level group, later registrations under the
/// same name reuse it. All registry state lives behind one async mutex, so
/// concurrent registrations during composed startup cannot create two
/// bindings for one name. Steady-state dispatch touches none of this state.
pub struct App<T: Transport> {
    transport: Arc<T>,
    state: Mutex<RegistryState<T::Group>>,
    dev_mode: bool,
}

struct RegistryState<G> {
    /// Group name -> transport-level group handle.
    bindings: HashMap<String, Arc<G>>,
    /// Identities of group instances already registered.
    registered: HashSet<Uuid>,
}

impl<T: Transport> App<T> {
    /// Creates an engine over the given transport.
    #[must_use]
    pub fn new(transport: Arc<T>, config: DispatchConfig) -> Self {
        Self {
            transport,
            state: Mutex::new(RegistryState {
                bindings: HashMap::new(),
                registered: HashSet::new(),
            }),
            dev_mode: config.dev_mode,
        }
    }

    /// Registers a group: binds every endpoint under the group's transport
    /// binding with its effective queue and metadata.
    ///
    /// Binds are best-effort and non-transactional. If a bind fails midway,
    /// earlier endpoints stay bound and the instance counts as registered,
    /// so a retry cannot double-bind them.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateGroup`] when this exact
    /// instance was registered before, or [`RegistrationError::Transport`]
    /// when a transport call fails.
    pub async fn register_group(&self, group: &HandlerGroup) -> Result<(), RegistrationError> {
        let mut state = self.state.lock().await;

        if state.registered.contains(&group.identity()) {
            return Err(RegistrationError::DuplicateGroup {
                identity: group.identity(),
            });
        }
        state.registered.insert(group.identity());

        let handle = match state.bindings.get(group.name()) {
            Some(handle) => Arc::clone(handle),
            None => {
                let handle = Arc::new(self.transport.add_group(group.name()).await?);
                state.bindings.insert(group.name().to_string(), Arc::clone(&handle));
                handle
            }
        };

        for endpoint in group.endpoints() {
            let queue = endpoint
                .queue_override()
                .or_else(|| group.default_queue())
                .cloned();
            let subject = format!("{}.{}", group.name(), endpoint.name());
            let binding = EndpointBinding {
                queue: queue.clone(),
                metadata: endpoint.metadata_map().clone(),
                handler: wrap_endpoint(endpoint.clone(), subject.clone(), self.dev_mode),
            };
            handle.add_endpoint(endpoint.name(), binding).await?;
            info!(subject = %subject, queue = ?queue, "endpoint bound");
        }
        Ok(())
    }

    /// Stops the transport service, then closes the connection.
    ///
    /// # Errors
    ///
    /// Returns the first transport error encountered.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.transport.stop().await?;
        self.transport.close().await
    }

    /// The transport this engine dispatches over.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

// ---------------------------------------------------------------------------
// Wrapped handler (per-message pipeline)
// ---------------------------------------------------------------------------

/// Wraps one endpoint with the full per-message pipeline.
fn wrap_endpoint(endpoint: Endpoint, subject: String, dev_mode: bool) -> MessageHandler {
    let endpoint = Arc::new(endpoint);
    Arc::new(move |delivery: Delivery| {
        let endpoint = Arc::clone(&endpoint);
        let subject = subject.clone();
        Box::pin(async move {
            handle_delivery(&endpoint, &subject, dev_mode, delivery).await;
        })
    })
}

/// Runs the pipeline for one delivery and publishes exactly one envelope to
/// the reply address, when there is one. Every failure kind is absorbed
/// here; nothing escapes to the transport's dispatch loop.
async fn handle_delivery(
    endpoint: &Endpoint,
    subject: &str,
    dev_mode: bool,
    delivery: Delivery,
) {
    let Delivery { message, reply } = delivery;

    let outcome = match message {
        Err(error) => {
            warn!(subject, %error, "transport delivery error");
            Reply::failure(classify(&RequestFailure::Delivery(error), dev_mode))
        }
        Ok(InboundMessage { payload, headers }) => match decode(endpoint, &payload).await {
            Err(failure) => {
                debug!(subject, %failure, "request rejected before handler");
                Reply::failure(classify(&failure, dev_mode))
            }
            Ok(decoded) => {
                let invocation = AssertUnwindSafe(endpoint.handler().handle(decoded, headers))
                    .catch_unwind()
                    .await;
                match invocation {
                    Ok(Ok(data)) => Reply::success(data),
                    Ok(Err(error)) => {
                        warn!(subject, %error, "handler failed");
                        Reply::failure(classify(&RequestFailure::Handler(error), dev_mode))
                    }
                    Err(panic) => {
                        let rendered = render_panic(panic.as_ref());
                        warn!(subject, panic = %rendered, "handler panicked");
                        Reply::failure(classify(&RequestFailure::Panic(rendered), dev_mode))
                    }
                }
            }
        },
    };

    match outcome.to_bytes() {
        Ok(body) => {
            // No reply address: the pipeline ran, publishing is a no-op.
            if let Some(reply) = reply {
                reply.publish(body).await;
            }
        }
        Err(error) => warn!(subject, %error, "reply envelope failed to serialize"),
    }
}

/// Renders a caught panic payload for the unknown-failure envelope.
fn render_panic(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
