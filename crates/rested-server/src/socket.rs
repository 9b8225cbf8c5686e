//! TCP listener binding for the server.
//!
//! Every accepted connection carries a sequence of length-prefixed request
//! envelopes. Each request is handed to the [`RequestHandler`] on its own
//! task and the connection writes the reply once the handler answers.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rested_protocol::{
    BinderState, BoxFuture, Envelope, ErrorCode, ErrorHandler, ErrorSlot, Lifecycle,
    ProtocolError, ReplyBody, ShutdownHandle, ShutdownPolicy, StartupPolicy, StatusCode, Uri,
    WireReply, WireRequest, read_frame, write_frame,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::binder::{
    RequestHandler, ServerProtocolBinder, SubscriptionHandler, SubscriptionStateHandler,
};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::event::ServerEvent;
use crate::request::ServerReply;

/// Server binding that accepts framed JSON envelopes over TCP.
pub struct SocketServerBinder {
    shared: Arc<Shared>,
}

struct Shared {
    config: ServerConfig,
    handler: RequestHandler,
    lifecycle: Lifecycle,
    shutdown: ShutdownHandle,
    errors: ErrorSlot,
    local_addr: Mutex<Option<SocketAddr>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    subscribers: Mutex<Option<(SubscriptionHandler, SubscriptionStateHandler)>>,
}

impl SocketServerBinder {
    pub fn new(config: ServerConfig, handler: RequestHandler) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                handler,
                lifecycle: Lifecycle::new(),
                shutdown: ShutdownHandle::new(),
                errors: ErrorSlot::new(),
                local_addr: Mutex::new(None),
                accept_task: Mutex::new(None),
                subscribers: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Opens an event source at `uri` and announces it to the subscription
    /// observers.
    pub fn open_event(&self, uri: Uri) -> ServerEvent {
        let observers = lock(&self.shared.subscribers).clone();
        let Some((handler, state_handler)) = observers else {
            return ServerEvent::new(uri);
        };
        let event = ServerEvent::new(uri).with_state_handler(state_handler);
        handler(&event);
        event
    }

    async fn start_inner(&self, policy: StartupPolicy) -> ServerResult<()> {
        let shared = &self.shared;
        shared.lifecycle.begin_start()?;
        shared.shutdown.rearm();

        let (listener, local) = match bind(shared.config.bind_addr).await {
            Ok(bound) => bound,
            Err(e) => {
                shared.lifecycle.abort_start();
                shared.errors.report(e.code());
                error!(addr = %shared.config.bind_addr, error = %e, "failed to bind");
                return Err(e);
            }
        };

        *lock(&shared.local_addr) = Some(local);
        info!(addr = %local, max_connections = shared.config.max_connections, "socket server listening");

        let task = tokio::spawn(accept_loop(Arc::clone(shared), listener));
        if !shared.lifecycle.mark_running() {
            task.abort();
            return Err(ServerError::Shutdown);
        }
        *lock(&shared.accept_task) = Some(task);

        if policy == StartupPolicy::Attached {
            shared.lifecycle.wait_stopped().await;
        }
        Ok(())
    }

    async fn stop_inner(&self, policy: ShutdownPolicy) -> ServerResult<()> {
        let shared = &self.shared;
        if !shared.lifecycle.begin_stop() {
            if shared.lifecycle.state() == BinderState::Stopping {
                // escalates a graceful stop already underway
                shared.shutdown.trigger(policy);
            }
            shared.lifecycle.wait_stopped().await;
            return Ok(());
        }

        debug!(?policy, "stopping socket server");
        shared.shutdown.trigger(policy);

        let task = lock(&shared.accept_task).take();
        if let Some(task) = task {
            log_join(task.await);
        }
        *lock(&shared.local_addr) = None;

        shared.lifecycle.mark_stopped();
        info!("socket server stopped");
        Ok(())
    }
}

impl ServerProtocolBinder for SocketServerBinder {
    fn start(&self, policy: StartupPolicy) -> BoxFuture<'_, ServerResult<()>> {
        Box::pin(self.start_inner(policy))
    }

    fn stop(&self, policy: ShutdownPolicy) -> BoxFuture<'_, ServerResult<()>> {
        Box::pin(self.stop_inner(policy))
    }

    fn stopped(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.shared.lifecycle.wait_stopped())
    }

    fn state(&self) -> BinderState {
        self.shared.lifecycle.state()
    }

    fn error(&self) -> Option<ErrorCode> {
        self.shared.errors.last()
    }

    fn observe_error(&self, handler: ErrorHandler) {
        self.shared.errors.observe_shared(handler);
    }

    fn observe_subscriptions(
        &self,
        handler: SubscriptionHandler,
        state_handler: SubscriptionStateHandler,
    ) {
        *lock(&self.shared.subscribers) = Some((handler, state_handler));
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.shared.local_addr)
    }
}

async fn bind(addr: SocketAddr) -> ServerResult<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await.map_err(|e| match e.kind() {
        io::ErrorKind::AddrInUse => ServerError::AddressInUse { addr },
        _ => ServerError::Io(e),
    })?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}

async fn accept(
    listener: &TcpListener,
    semaphore: &Arc<Semaphore>,
) -> io::Result<(TcpStream, SocketAddr, OwnedSemaphorePermit)> {
    let permit = Arc::clone(semaphore)
        .acquire_owned()
        .await
        .map_err(io::Error::other)?;
    let (stream, peer) = listener.accept().await?;
    Ok((stream, peer, permit))
}

async fn accept_loop(shared: Arc<Shared>, listener: TcpListener) {
    let semaphore = Arc::new(Semaphore::new(shared.config.max_connections));
    let mut connections = JoinSet::new();

    let policy = loop {
        tokio::select! {
            policy = shared.shutdown.wait().wait() => break policy,
            accepted = accept(&listener, &semaphore) => match accepted {
                Ok((stream, peer, permit)) => {
                    debug!(%peer, "accepted connection");
                    let connection = Connection::new(stream, &shared.config, permit);
                    connections.spawn(serve_connection(Arc::clone(&shared), connection, peer));
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    shared.errors.report(ErrorCode::Io);
                }
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                log_join(finished);
            }
        }
    };
    drop(listener);

    if policy == ShutdownPolicy::Graceful && !connections.is_empty() {
        info!(pending = connections.len(), "draining connections");
        let forced = shared.shutdown.wait_forced().wait();
        tokio::pin!(forced);
        loop {
            tokio::select! {
                finished = connections.join_next() => match finished {
                    Some(finished) => log_join(finished),
                    None => break,
                },
                _ = &mut forced => break,
            }
        }
    }

    if !connections.is_empty() {
        info!(pending = connections.len(), "aborting connections");
        connections.shutdown().await;
    }
}

/// Aborts the handler if the connection goes away first.
struct HandlerTask(JoinHandle<()>);

impl HandlerTask {
    async fn finish(mut self) {
        log_join((&mut self.0).await);
    }
}

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn serve_connection(shared: Arc<Shared>, mut connection: Connection, peer: SocketAddr) {
    loop {
        let envelope = tokio::select! {
            _ = shared.shutdown.wait().wait() => break,
            read = connection.read_request() => match read {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    debug!(%peer, "client closed connection");
                    break;
                }
                Err(ServerError::Protocol(ProtocolError::Timeout { .. })) => {
                    debug!(%peer, "idle connection timed out");
                    break;
                }
                Err(e) => {
                    warn!(%peer, error = %e, "failed to read request");
                    shared.errors.report(e.code());
                    break;
                }
            },
        };

        let request_id = envelope.request_id.clone();
        let target = envelope.payload.uri.clone();
        let request = envelope
            .check_version()
            .and_then(|()| envelope.payload.into_request());

        let (reply, ack, handler) = match request {
            Ok(request) => {
                debug!(%peer, %request_id, method = %request.method(), uri = %target, "dispatching request");
                let (reply, pending) =
                    ServerReply::new(request.uri().clone(), shared.config.content_type.as_str());
                let handler = HandlerTask(tokio::spawn((shared.handler)(request.into(), reply)));
                match pending.recv().await {
                    Some((reply, ack)) => (reply, Some(ack), Some(handler)),
                    None => (error_reply(StatusCode::InternalServerError, &target), None, Some(handler)),
                }
            }
            Err(e) => {
                warn!(%peer, %request_id, error = %e, "rejecting request");
                shared.errors.report(e.code());
                (error_reply(StatusCode::BadRequest, &target), None, None)
            }
        };

        let status = reply.status;
        match connection.write_reply(&Envelope::new(request_id.as_str(), reply)).await {
            Ok(()) => {
                debug!(%peer, %request_id, status, "reply written");
                if let Some(ack) = ack {
                    ack.complete(Ok(()));
                }
                if let Some(handler) = handler {
                    handler.finish().await;
                }
            }
            Err(e) => {
                warn!(%peer, %request_id, error = %e, "failed to write reply");
                shared.errors.report(e.code());
                if let Some(ack) = ack {
                    ack.complete(Err(e));
                }
                break;
            }
        }
    }
}

fn error_reply(status: StatusCode, target: &str) -> WireReply {
    let uri = Uri::parse(target).unwrap_or_default();
    WireReply::new(status, &uri, ReplyBody::Empty)
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        error!(error = %e, "server task panicked");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A client connection to the server.
struct Connection {
    stream: TcpStream,
    timeout: Duration,
    max_message_size: u32,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    fn new(stream: TcpStream, config: &ServerConfig, permit: OwnedSemaphorePermit) -> Self {
        Self {
            stream,
            timeout: config.connection_timeout,
            max_message_size: config.max_message_size,
            _permit: permit,
        }
    }

    /// Returns `Ok(None)` if the connection was closed cleanly.
    async fn read_request(&mut self) -> ServerResult<Option<Envelope<WireRequest>>> {
        let read = read_frame(&mut self.stream, self.max_message_size);
        match tokio::time::timeout(self.timeout, read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::Timeout {
                operation: "read request".to_string(),
            }
            .into()),
        }
    }

    async fn write_reply(&mut self, envelope: &Envelope<WireReply>) -> ServerResult<()> {
        let write = write_frame(&mut self.stream, envelope, self.max_message_size);
        match tokio::time::timeout(self.timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::Timeout {
                operation: "write reply".to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::handler_fn;
    use rested_protocol::{RequestMethod, SubscriptionState};

    fn binder() -> SocketServerBinder {
        let config = ServerConfig::default().with_bind_addr(([127, 0, 0, 1], 0).into());
        SocketServerBinder::new(
            config,
            handler_fn(|mut request, mut reply| async move {
                let route = request.uri().path().segment(0).unwrap_or_default().to_string();
                let _ = match route.as_str() {
                    "echo" => reply.send(request.release_object().unwrap_or_default()).await,
                    "created" => {
                        reply.set_status(StatusCode::Created);
                        reply.send_empty().await
                    }
                    "slow" => {
                        tokio::time::sleep(Duration::from_millis(150)).await;
                        reply.send_empty().await
                    }
                    "hang" => {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        reply.send_empty().await
                    }
                    "panic" => panic!("handler failure"),
                    _ => {
                        drop(reply);
                        Ok(())
                    }
                };
            }),
        )
    }

    async fn started() -> (SocketServerBinder, SocketAddr) {
        let binder = binder();
        binder.start(StartupPolicy::Detached).await.unwrap();
        let addr = binder.local_addr().unwrap();
        (binder, addr)
    }

    async fn exchange(addr: SocketAddr, envelope: &Envelope<WireRequest>) -> Envelope<WireReply> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut stream, envelope, 1024 * 1024).await.unwrap();
        read_frame(&mut stream, 1024 * 1024).await.unwrap().unwrap()
    }

    fn post(addr: SocketAddr, path: &str, body: Option<&str>) -> Envelope<WireRequest> {
        let uri = format!("http://{addr}/{path}");
        Envelope::new("req-1", WireRequest::new(RequestMethod::Post, uri, body.map(String::from)))
    }

    #[tokio::test]
    async fn serves_requests() {
        let (binder, addr) = started().await;
        assert_eq!(binder.state(), BinderState::Running);

        let reply = exchange(addr, &post(addr, "echo", Some(r#"{"id":7}"#))).await;
        assert_eq!(reply.request_id, "req-1");
        assert_eq!(reply.payload.status, 200);
        assert_eq!(reply.payload.body, ReplyBody::Object(r#"{ "id" : 7 }"#.into()));

        let reply = exchange(addr, &post(addr, "created", None)).await;
        assert_eq!(reply.payload.status_code().unwrap(), StatusCode::Created);
        assert_eq!(reply.payload.body, ReplyBody::Empty);
        assert_eq!(binder.error(), None);

        binder.stop(ShutdownPolicy::Graceful).await.unwrap();
        assert_eq!(binder.state(), BinderState::Stopped);
        assert_eq!(binder.local_addr(), None);
    }

    #[tokio::test]
    async fn several_requests_on_one_connection() {
        let (binder, addr) = started().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        for id in 0..3 {
            let request = post(addr, "echo", Some(&format!(r#"{{"n":{id}}}"#)));
            write_frame(&mut stream, &request, 1024).await.unwrap();
            let reply: Envelope<WireReply> = read_frame(&mut stream, 1024).await.unwrap().unwrap();
            let expected = format!(r#"{{ "n" : {id} }}"#);
            assert_eq!(reply.payload.body, ReplyBody::Object(expected));
        }

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (binder, addr) = started().await;

        let reply = exchange(addr, &post(addr, "echo", Some("{\"id\":"))).await;
        assert_eq!(reply.payload.status_code().unwrap(), StatusCode::BadRequest);
        assert_eq!(binder.error(), Some(ErrorCode::MalformedDocument));

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn hostile_nesting_is_a_bad_request() {
        let (binder, addr) = started().await;

        let body = format!("{{\"a\":{}1{}}}", "[".repeat(50_000), "]".repeat(50_000));
        let reply = exchange(addr, &post(addr, "echo", Some(&body))).await;
        assert_eq!(reply.payload.status_code().unwrap(), StatusCode::BadRequest);
        assert_eq!(binder.error(), Some(ErrorCode::MalformedDocument));

        // the binder keeps serving
        let reply = exchange(addr, &post(addr, "echo", Some(r#"{"id":1}"#))).await;
        assert_eq!(reply.payload.status, 200);

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_version_is_rejected() {
        let (binder, addr) = started().await;

        let mut request = post(addr, "echo", None);
        request.protocol_version = "99".into();
        let reply = exchange(addr, &request).await;
        assert_eq!(reply.payload.status, 400);
        assert_eq!(binder.error(), Some(ErrorCode::Protocol));

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_and_panicking_handlers_reply_500() {
        let (binder, addr) = started().await;

        let reply = exchange(addr, &post(addr, "dropped", None)).await;
        assert_eq!(reply.payload.status, 500);

        let reply = exchange(addr, &post(addr, "panic", None)).await;
        assert_eq!(reply.payload.status, 500);

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn address_in_use() {
        let (first, addr) = started().await;

        let config = ServerConfig::new(addr);
        let second = SocketServerBinder::new(config, handler_fn(|_, _| async {}));
        let err = second.start(StartupPolicy::Detached).await.unwrap_err();
        assert!(matches!(err, ServerError::AddressInUse { addr: a } if a == addr));
        assert_eq!(second.state(), BinderState::Stopped);
        assert_eq!(second.error(), Some(ErrorCode::AddressInUse));

        first.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let (binder, _addr) = started().await;
        let err = binder.start(StartupPolicy::Detached).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotRunning);
        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_restartable() {
        let binder = binder();
        binder.stop(ShutdownPolicy::Graceful).await.unwrap();
        assert_eq!(binder.state(), BinderState::Created);

        binder.start(StartupPolicy::Detached).await.unwrap();
        binder.stop(ShutdownPolicy::Graceful).await.unwrap();
        binder.stop(ShutdownPolicy::Forced).await.unwrap();
        assert_eq!(binder.state(), BinderState::Stopped);

        binder.start(StartupPolicy::Detached).await.unwrap();
        let addr = binder.local_addr().unwrap();
        let reply = exchange(addr, &post(addr, "echo", None)).await;
        assert_eq!(reply.payload.status, 200);
        binder.stop(ShutdownPolicy::Forced).await.unwrap();
    }

    #[tokio::test]
    async fn attached_start_returns_after_stop() {
        let binder = Arc::new(binder());
        let serving = tokio::spawn({
            let binder = Arc::clone(&binder);
            async move { binder.start(StartupPolicy::Attached).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(binder.state(), BinderState::Running);
        assert!(!serving.is_finished());

        binder.stop(ShutdownPolicy::Graceful).await.unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn graceful_stop_finishes_in_flight_requests() {
        let (binder, addr) = started().await;
        let pending = tokio::spawn(async move { exchange(addr, &post(addr, "slow", None)).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        binder.stop(ShutdownPolicy::Graceful).await.unwrap();

        let reply = pending.await.unwrap();
        assert_eq!(reply.payload.status, 200);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn forced_stop_abandons_in_flight_requests() {
        let (binder, addr) = started().await;
        let pending = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            write_frame(&mut stream, &post(addr, "hang", None), 1024).await.unwrap();
            read_frame::<_, Envelope<WireReply>>(&mut stream, 1024).await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tokio::time::timeout(Duration::from_secs(2), binder.stop(ShutdownPolicy::Forced))
            .await
            .unwrap()
            .unwrap();

        let read = pending.await.unwrap();
        assert!(!matches!(read, Ok(Some(_))));
    }

    #[tokio::test]
    async fn forced_stop_escalates_graceful_stop() {
        let binder = Arc::new(binder());
        binder.start(StartupPolicy::Detached).await.unwrap();
        let addr = binder.local_addr().unwrap();
        let _client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            write_frame(&mut stream, &post(addr, "hang", None), 1024).await.unwrap();
            let _ = read_frame::<_, Envelope<WireReply>>(&mut stream, 1024).await;
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let graceful = tokio::spawn({
            let binder = Arc::clone(&binder);
            async move { binder.stop(ShutdownPolicy::Graceful).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(binder.state(), BinderState::Stopping);

        binder.stop(ShutdownPolicy::Forced).await.unwrap();
        graceful.await.unwrap().unwrap();
        assert_eq!(binder.state(), BinderState::Stopped);
    }

    #[test]
    fn open_event_notifies_observers() {
        let binder = binder();
        let opened = Arc::new(Mutex::new(Vec::new()));
        let changes = Arc::new(Mutex::new(Vec::new()));

        let event = binder.open_event(Uri::parse("http://localhost/quiet").unwrap());
        assert_eq!(event.state(), SubscriptionState::Subscribed);

        binder.observe_subscriptions(
            Arc::new({
                let opened = Arc::clone(&opened);
                move |event: &ServerEvent| opened.lock().unwrap().push(event.uri().to_string())
            }),
            Arc::new({
                let changes = Arc::clone(&changes);
                move |_uri: &Uri, state: SubscriptionState| changes.lock().unwrap().push(state)
            }),
        );

        let mut event = binder.open_event(Uri::parse("http://localhost/feed").unwrap());
        event.set_subscription_state(SubscriptionState::Canceled).unwrap();

        assert_eq!(*opened.lock().unwrap(), ["http://localhost/feed"]);
        assert_eq!(*changes.lock().unwrap(), [SubscriptionState::Canceled]);
    }

    #[tokio::test]
    async fn error_observers_are_called() {
        let binder = binder();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        binder.observe_error(Arc::new(move |code: ErrorCode| sink.lock().unwrap().push(code)));

        binder.start(StartupPolicy::Detached).await.unwrap();
        let addr = binder.local_addr().unwrap();
        exchange(addr, &post(addr, "echo", Some("[1,2]"))).await;
        binder.stop(ShutdownPolicy::Forced).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), [ErrorCode::MalformedDocument]);
    }
}
