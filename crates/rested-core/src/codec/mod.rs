//! Text codecs for object graph trees.
//!
//! A codec is picked by content type with [`serializer_for`]. Only JSON is
//! implemented; unknown content types fall back to it.
//!
//! ```rust
//! use rested_core::codec::serializer_for;
//! use rested_core::ogm::Object;
//!
//! let codec = serializer_for("application/json");
//! let object = Object::new().with_field("a", 1).with_field("b", "x");
//!
//! let text = codec.serialize_object(&object);
//! assert_eq!(text, r#"{ "a" : 1, "b" : "x" }"#);
//! assert_eq!(codec.deserialize(&text).unwrap(), object);
//! ```

mod json;
mod scanner;

use std::fmt;
use std::str::FromStr;

use crate::error::{CodecError, CodecResult};
use crate::ogm::{Array, Field, Object, Value};

pub use json::JsonSerializer;

/// Content type used when none is negotiated.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Converts trees to text and back.
pub trait Serializer: Send + Sync {
    /// Returns the content type this codec produces.
    fn content_type(&self) -> &'static str;

    fn serialize_value(&self, value: &Value) -> String;

    fn serialize_array(&self, array: &Array) -> String;

    fn serialize_object(&self, object: &Object) -> String;

    fn serialize_field(&self, field: &Field) -> String;

    /// Parses a document whose root is an object.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedDocument`] when the text is not an
    /// object or its brackets and quotes do not balance.
    fn deserialize(&self, text: &str) -> CodecResult<Object>;

    /// Parses a single value of any kind.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedDocument`] on unbalanced input.
    fn deserialize_value(&self, text: &str) -> CodecResult<Value>;
}

static JSON: JsonSerializer = JsonSerializer;

/// Returns the codec for `content_type`.
///
/// Parameters such as `; charset=utf-8` are ignored. Unknown content types
/// get the JSON codec.
pub fn serializer_for(content_type: &str) -> &'static dyn Serializer {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence != DEFAULT_CONTENT_TYPE {
        ::tracing::debug!(content_type, "no codec for content type, using JSON");
    }
    &JSON
}

impl Value {
    /// Serializes this value with the default codec.
    pub fn serialize(&self) -> String {
        JSON.serialize_value(self)
    }
}

impl Array {
    /// Serializes this array with the default codec.
    pub fn serialize(&self) -> String {
        JSON.serialize_array(self)
    }
}

impl Object {
    /// Serializes this object with the default codec.
    pub fn serialize(&self) -> String {
        JSON.serialize_object(self)
    }
}

impl Field {
    /// Serializes this field with the default codec.
    pub fn serialize(&self) -> String {
        JSON.serialize_field(self)
    }
}

impl FromStr for Object {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JSON.deserialize(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_defaults_to_json() {
        assert_eq!(serializer_for("application/json").content_type(), "application/json");
        assert_eq!(
            serializer_for("Application/JSON; charset=utf-8").content_type(),
            "application/json"
        );
        assert_eq!(serializer_for("text/plain").content_type(), "application/json");
        assert_eq!(serializer_for("").content_type(), "application/json");
    }

    #[test]
    fn from_str_and_display() {
        let object: Object = r#"{ "a" : 1 }"#.parse().unwrap();
        assert_eq!(object.to_string(), r#"{ "a" : 1 }"#);
        assert!("[ 1 ]".parse::<Object>().is_err());
    }
}
