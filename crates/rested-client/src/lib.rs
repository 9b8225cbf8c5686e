//! Client facade, protocol binder trait and socket binding
//!
//! A [`Client`] owns one [`ClientProtocolBinder`] and forwards every call to
//! it. [`SocketBinder`] is the bundled binding; it speaks length-prefixed
//! JSON frames over TCP to a `rested-server`.
//!
//! ```ignore
//! use rested_client::{Client, ClientConfig};
//! use rested_protocol::{Request, RequestMethod, ShutdownPolicy, Uri};
//!
//! let client = Client::connect("ui", ClientConfig::default()).await?;
//! let uri = Uri::parse("http://127.0.0.1:8080/items")?;
//! let reply = client.send(Request::new(RequestMethod::Get, uri, None)).await?;
//! client.stop(ShutdownPolicy::Graceful).await?;
//! ```

pub mod binder;
pub mod client;
pub mod config;
pub mod error;
pub mod socket;

pub use binder::ClientProtocolBinder;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use socket::SocketBinder;
