//! The client facade.

use std::sync::Arc;

use rested_protocol::{
    BinderState, ErrorCode, Event, EventPolicy, Reply, Request, ShutdownPolicy, Uri,
};
use tracing::{debug, info, warn};

use crate::binder::ClientProtocolBinder;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::socket::SocketBinder;

/// Application-facing client bound to exactly one transport.
///
/// Every operation is forwarded to the binder. A `Client` can be shared
/// behind an `Arc` to issue concurrent sends.
pub struct Client {
    instance_id: String,
    binder: Box<dyn ClientProtocolBinder>,
}

impl Client {
    /// Creates a client over `binder`. The binder is not started.
    pub fn new(instance_id: impl Into<String>, binder: impl ClientProtocolBinder + 'static) -> Self {
        Self {
            instance_id: instance_id.into(),
            binder: Box::new(binder),
        }
    }

    /// Creates a client over a [`SocketBinder`] and starts it.
    pub async fn connect(instance_id: impl Into<String>, config: ClientConfig) -> ClientResult<Self> {
        let client = Self::new(instance_id, SocketBinder::new(config));
        client.start().await?;
        Ok(client)
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn state(&self) -> BinderState {
        self.binder.state()
    }

    pub async fn start(&self) -> ClientResult<()> {
        info!(instance = %self.instance_id, "starting client");
        self.binder.start().await
    }

    pub async fn stop(&self, policy: ShutdownPolicy) -> ClientResult<()> {
        info!(instance = %self.instance_id, ?policy, "stopping client");
        self.binder.stop(policy).await
    }

    /// Sends `request` and returns the owned reply.
    pub async fn send(&self, request: Request) -> ClientResult<Reply> {
        debug!(
            instance = %self.instance_id,
            method = %request.method(),
            uri = %request.uri(),
            "sending request"
        );
        let result = self.binder.send(request).await;
        if let Err(e) = &result {
            warn!(instance = %self.instance_id, error = %e, "request failed");
        }
        result
    }

    pub fn subscribe(&self, uri: Uri, policy: EventPolicy) -> ClientResult<Event> {
        self.binder.subscribe(uri, policy)
    }

    /// The most recent transport error of the binder.
    pub fn error(&self) -> Option<ErrorCode> {
        self.binder.error()
    }

    pub fn observe_error(&self, handler: impl Fn(ErrorCode) + Send + Sync + 'static) {
        self.binder.observe_error(Arc::new(handler));
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
