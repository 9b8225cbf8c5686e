//! Object graph model, JSON codec, tracing setup
//!
//! The object graph model ([`ogm`]) is the typed tree used for request and
//! reply payloads. The [`codec`] module turns such a tree into text and back.

pub mod codec;
pub mod error;
pub mod ogm;
pub mod tracing;

pub use codec::{JsonSerializer, Serializer, serializer_for, DEFAULT_CONTENT_TYPE};
pub use error::{CodecError, CodecResult};
pub use ogm::{Array, Field, Node, NodeType, Object, Value};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
