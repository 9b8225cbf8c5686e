//! Server side of the rested transport.
//!
//! A [`Server`] owns one or more [`ServerProtocolBinder`]s and hands every
//! incoming request to a single [`RequestHandler`]:
//!
//! ```no_run
//! use rested_protocol::StartupPolicy;
//! use rested_server::{Server, handler_fn};
//!
//! # async fn run() -> rested_server::ServerResult<()> {
//! let server = Server::new("items", handler_fn(|mut request, reply| async move {
//!     let object = request.release_object().unwrap_or_default();
//!     let _ = reply.send(object).await;
//! }));
//! server.start(StartupPolicy::Attached).await
//! # }
//! ```

pub mod binder;
pub mod config;
pub mod error;
pub mod event;
pub mod request;
pub mod server;
pub mod signals;
pub mod socket;

pub use binder::{
    RequestHandler, ServerProtocolBinder, SubscriptionHandler, SubscriptionStateHandler,
    handler_fn,
};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use event::ServerEvent;
pub use request::{PendingReply, ReplyAck, ServerReply, ServerRequest};
pub use server::Server;
pub use signals::SignalHandler;
pub use socket::SocketServerBinder;
