//! Object graph model: the typed tree used for request and reply payloads.
//!
//! A tree is built from [`Value`] nodes. Scalars hold their payload inline;
//! an [`Array`] exclusively owns its elements and an [`Object`] exclusively
//! owns its [`Field`]s, each of which owns exactly one value. Nothing in a
//! tree is shared, so `Clone` is a full deep copy and mutating the copy
//! never affects the original.
//!
//! # Example
//!
//! ```rust
//! use rested_core::ogm::{Array, Field, Object, Value};
//!
//! let mut object = Object::new()
//!     .with_field("name", "sensor-1")
//!     .with_field("readings", Array::from_iter([Value::from(3), Value::from(4)]));
//! object.insert(Field::new("scale", 0.5));
//!
//! assert_eq!(object.len(), 3);
//! assert_eq!(object.get("name").and_then(Value::as_str), Some("sensor-1"));
//! ```

mod array;
mod field;
mod node;
mod object;
mod value;

pub use array::Array;
pub use field::Field;
pub use node::{Node, NodeType};
pub use object::Object;
pub use value::Value;
