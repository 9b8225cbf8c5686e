//! The server-side transport abstraction.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use rested_protocol::{
    BinderState, BoxFuture, ErrorCode, ErrorHandler, ShutdownPolicy, StartupPolicy, StateHandler,
};

use crate::error::ServerResult;
use crate::event::ServerEvent;
use crate::request::{ServerReply, ServerRequest};

/// Application code that answers requests.
///
/// The handler owns the reply and must finish it with one of its terminal
/// methods; dropping it answers `500 Internal Server Error`.
pub type RequestHandler =
    Arc<dyn Fn(ServerRequest, ServerReply) -> BoxFuture<'static, ()> + Send + Sync>;

/// Called when a client subscribes to an event source.
pub type SubscriptionHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Called when a subscription changes state.
pub type SubscriptionStateHandler = StateHandler;

/// Wraps an async closure as a [`RequestHandler`].
pub fn handler_fn<F, Fut>(handler: F) -> RequestHandler
where
    F: Fn(ServerRequest, ServerReply) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(
        move |request: ServerRequest, reply: ServerReply| -> BoxFuture<'static, ()> {
            Box::pin(handler(request, reply))
        },
    )
}

/// A transport that accepts requests and hands them to a [`RequestHandler`].
pub trait ServerProtocolBinder: Send + Sync {
    /// Starts accepting requests.
    ///
    /// With [`StartupPolicy::Attached`] the returned future resolves only
    /// after the binder has stopped again.
    fn start(&self, policy: StartupPolicy) -> BoxFuture<'_, ServerResult<()>>;

    /// Stops accepting requests.
    ///
    /// A graceful stop lets in-flight requests finish; a forced stop
    /// abandons them. Stopping twice succeeds.
    fn stop(&self, policy: ShutdownPolicy) -> BoxFuture<'_, ServerResult<()>>;

    /// Resolves once the binder is stopped.
    fn stopped(&self) -> BoxFuture<'_, ()>;

    fn state(&self) -> BinderState;

    fn error(&self) -> Option<ErrorCode>;

    fn observe_error(&self, handler: ErrorHandler);

    fn observe_subscriptions(
        &self,
        handler: SubscriptionHandler,
        state_handler: SubscriptionStateHandler,
    );

    /// The bound address, for bindings that listen on a socket.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}
