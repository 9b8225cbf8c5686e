//! The client-side transport abstraction.

use rested_protocol::{
    BinderState, BoxFuture, ErrorCode, ErrorHandler, Event, EventPolicy, Reply, Request,
    ShutdownPolicy, Uri,
};

use crate::error::ClientResult;

/// A transport that carries requests to a server and brings back replies.
///
/// Implementations must keep themselves restartable: after a `stop`
/// completes, `start` may be called again.
///
/// # Example
///
/// ```ignore
/// struct Loopback { /* ... */ }
///
/// impl ClientProtocolBinder for Loopback {
///     fn send(&self, request: Request) -> BoxFuture<'_, ClientResult<Reply>> {
///         Box::pin(async move {
///             let (header, object) = request.into_parts();
///             Ok(Reply::new(header.uri().clone(), StatusCode::Ok, object))
///         })
///     }
///     // ... other methods
/// }
/// ```
pub trait ClientProtocolBinder: Send + Sync {
    /// Brings the binder to the running state.
    fn start(&self) -> BoxFuture<'_, ClientResult<()>>;

    /// Stops the binder.
    ///
    /// Stopping a binder that is not running, or is already being stopped,
    /// succeeds without side effects once it has stopped.
    fn stop(&self, policy: ShutdownPolicy) -> BoxFuture<'_, ClientResult<()>>;

    /// Sends a request and waits for its reply.
    ///
    /// # Errors
    ///
    /// Fails with `NotRunning` unless the binder is running, and with a
    /// transport or protocol error otherwise.
    fn send(&self, request: Request) -> BoxFuture<'_, ClientResult<Reply>>;

    /// Subscribes to events published at `uri`.
    fn subscribe(&self, uri: Uri, policy: EventPolicy) -> ClientResult<Event> {
        Ok(Event::new(uri, policy))
    }

    fn state(&self) -> BinderState;

    /// The most recent transport error.
    fn error(&self) -> Option<ErrorCode>;

    /// Registers a callback for transport errors.
    fn observe_error(&self, handler: ErrorHandler);
}
