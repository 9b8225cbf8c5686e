//! Messages, headers, URIs and wire framing for rested.
//!
//! This crate holds everything the client and server sides share:
//!
//! - [`Uri`] and [`UriBuilder`] for addressing
//! - [`RequestHeader`], [`ReplyHeader`], [`StatusCode`], [`RequestMethod`]
//! - [`Request`] and [`Reply`], which own an optional [`Object`] payload
//! - [`Event`] and the subscription state machine
//! - [`ErrorCode`] and [`ErrorSlot`] for binder error observation
//! - [`Lifecycle`] and [`ShutdownHandle`] for binder start/stop
//! - the socket wire format: an [`Envelope`] framed as length-prefixed JSON
//!
//! # Wire format
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON envelope   |
//! +----------------+------------------+
//! ```
//!
//! ```rust
//! use rested_protocol::{Envelope, RequestMethod, WireRequest, read_frame, write_frame};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut client, mut server) = tokio::io::duplex(4096);
//! let request = WireRequest::new(RequestMethod::Get, "http://localhost:8080/a", None);
//! write_frame(&mut client, &Envelope::new("req-1", request), 1024).await.unwrap();
//!
//! let decoded: Envelope<WireRequest> = read_frame(&mut server, 1024).await.unwrap().unwrap();
//! assert_eq!(decoded.payload.uri, "http://localhost:8080/a");
//! # }
//! ```
//!
//! [`Object`]: rested_core::Object

use std::future::Future;
use std::pin::Pin;

mod error;
mod event;
mod framing;
mod header;
mod lifecycle;
mod message;
mod observer;
mod policy;
mod uri;
mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{Event, StateHandler};
pub use framing::{encode_message_limited, read_frame, write_frame};
pub use header::{ReplyHeader, RequestHeader, RequestMethod, StatusCode};
pub use lifecycle::{BinderState, Lifecycle, ShutdownHandle, ShutdownSignal};
pub use message::{Reply, Request};
pub use observer::{ErrorCode, ErrorHandler, ErrorSlot};
pub use policy::{EventPolicy, ShutdownPolicy, StartupPolicy, SubscriptionState};
pub use uri::{Uri, UriBuilder, UriPath, UriQuery};
pub use wire::{Envelope, ReplyBody, WireReply, WireRequest};

/// A boxed future, used to keep binder traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Protocol version constant.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum frame size (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
