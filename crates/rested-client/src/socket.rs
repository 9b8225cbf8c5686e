//! TCP socket binding for the client.
//!
//! Each request opens a connection to the host and port of its URI, writes
//! one request frame and reads one reply frame.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rested_core::serializer_for;
use rested_protocol::{
    BinderState, BoxFuture, Envelope, ErrorCode, ErrorHandler, ErrorSlot, Event, EventPolicy,
    Lifecycle, Reply, Request, ShutdownHandle, ShutdownPolicy, Uri, WireReply, WireRequest,
    read_frame, write_frame,
};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::binder::ClientProtocolBinder;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Live `Event` count per subscribed URI.
type Registry = BTreeMap<Uri, usize>;

/// Client binding that speaks framed JSON envelopes over TCP.
pub struct SocketBinder {
    config: ClientConfig,
    lifecycle: Lifecycle,
    shutdown: ShutdownHandle,
    /// Sends hold a read guard; a stop takes the write guard to wait them out.
    in_flight: RwLock<()>,
    errors: ErrorSlot,
    subscriptions: Arc<Mutex<Registry>>,
}

impl SocketBinder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
            shutdown: ShutdownHandle::new(),
            in_flight: RwLock::new(()),
            errors: ErrorSlot::new(),
            subscriptions: Arc::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URIs with at least one live subscription, in order.
    pub fn subscriptions(&self) -> Vec<Uri> {
        lock(&self.subscriptions).keys().cloned().collect()
    }

    async fn start_inner(&self) -> ClientResult<()> {
        self.lifecycle.begin_start()?;
        self.shutdown.rearm();
        self.lifecycle.mark_running();
        info!("socket client binder running");
        Ok(())
    }

    async fn stop_inner(&self, policy: ShutdownPolicy) -> ClientResult<()> {
        if !self.lifecycle.begin_stop() {
            if self.lifecycle.state() == BinderState::Stopping {
                // a forced stop cuts short a graceful one still draining
                self.shutdown.trigger(policy);
            }
            self.lifecycle.wait_stopped().await;
            return Ok(());
        }

        debug!(?policy, "stopping socket client binder");
        self.shutdown.trigger(policy);
        let _drained = self.in_flight.write().await;
        self.lifecycle.mark_stopped();
        info!("socket client binder stopped");
        Ok(())
    }

    async fn send_inner(&self, request: Request) -> ClientResult<Reply> {
        let _in_flight = self.in_flight.read().await;

        let state = self.lifecycle.state();
        if state != BinderState::Running {
            return Err(ClientError::NotRunning { state });
        }

        let cancel = self.shutdown.wait_forced();
        tokio::select! {
            result = self.exchange(request) => result,
            _ = cancel.wait() => Err(ClientError::Shutdown),
        }
    }

    async fn exchange(&self, request: Request) -> ClientResult<Reply> {
        let uri = request.uri();
        let (Some(host), Some(port)) = (uri.host(), uri.port()) else {
            return Err(ClientError::InvalidRequest(format!(
                "URI has no host and port: {uri:?}"
            )));
        };
        let address = format!("{host}:{port}");

        let codec = serializer_for(&self.config.content_type);
        let envelope = Envelope::with_new_id(WireRequest::from_request(&request, codec));
        let max = self.config.max_message_size;

        debug!(
            address = %address,
            request_id = %envelope.request_id,
            method = %request.method(),
            "connecting to server"
        );

        let mut stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| ClientError::Timeout(format!("connecting to {address}")))?
            .map_err(|e| ClientError::connection(&address, e))?;

        let response = tokio::time::timeout(self.config.request_timeout, async {
            write_frame(&mut stream, &envelope, max).await?;
            read_frame::<_, Envelope<WireReply>>(&mut stream, max).await
        })
        .await
        .map_err(|_| ClientError::Timeout("waiting for reply".into()))??;

        let Some(response) = response else {
            return Err(ClientError::connection(&address, "connection closed before reply"));
        };
        response.check_version()?;

        if response.request_id != envelope.request_id {
            warn!(
                expected = %envelope.request_id,
                received = %response.request_id,
                "reply request_id mismatch"
            );
        }

        let reply = response.payload.into_reply()?;
        debug!(
            request_id = %envelope.request_id,
            status = %reply.status(),
            "reply received"
        );
        Ok(reply)
    }
}

impl ClientProtocolBinder for SocketBinder {
    fn start(&self) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(self.start_inner())
    }

    fn stop(&self, policy: ShutdownPolicy) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(self.stop_inner(policy))
    }

    fn send(&self, request: Request) -> BoxFuture<'_, ClientResult<Reply>> {
        Box::pin(async move {
            let result = self.send_inner(request).await;
            if let Err(e) = &result {
                self.errors.report(e.code());
            }
            result
        })
    }

    fn subscribe(&self, uri: Uri, policy: EventPolicy) -> ClientResult<Event> {
        let state = self.lifecycle.state();
        if state != BinderState::Running {
            self.errors.report(ErrorCode::NotRunning);
            return Err(ClientError::NotRunning { state });
        }

        *lock(&self.subscriptions).entry(uri.clone()).or_default() += 1;
        debug!(uri = %uri, ?policy, "subscribed");

        let registry = Arc::clone(&self.subscriptions);
        Ok(Event::new(uri, policy).with_state_handler(move |uri, state| {
            if !state.is_canceled() {
                return;
            }
            let mut counts = lock(&registry);
            if let Some(count) = counts.get_mut(uri) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(uri);
                }
            }
        }))
    }

    fn state(&self) -> BinderState {
        self.lifecycle.state()
    }

    fn error(&self) -> Option<ErrorCode> {
        self.errors.last()
    }

    fn observe_error(&self, handler: ErrorHandler) {
        self.errors.observe_shared(handler);
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
