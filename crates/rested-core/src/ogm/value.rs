//! Payload-carrying nodes.

use super::{Array, Node, NodeType, Object};

/// A node that carries payload data.
///
/// Fields are not values: a [`Field`](super::Field) pairs a name with a value
/// and only lives inside an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// Floating point number.
    Real(f64),
    /// UTF-8 text.
    String(String),
    /// Ordered sequence of owned values.
    Array(Array),
    /// Ordered sequence of owned fields.
    Object(Object),
}

impl Value {
    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the real payload, if this is a `Real`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the value, returning the array it holds.
    pub fn into_array(self) -> Option<Array> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the value, returning the object it holds.
    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl Node for Value {
    fn node_type(&self) -> NodeType {
        match self {
            Self::Int(_) => NodeType::Int,
            Self::Real(_) => NodeType::Real,
            Self::String(_) => NodeType::String,
            Self::Array(_) => NodeType::Array,
            Self::Object(_) => NodeType::Object,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Self::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_accessors() {
        assert_eq!(Value::from(42).as_int(), Some(42));
        assert_eq!(Value::from(2.5).as_real(), Some(2.5));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from("hi").as_int(), None);
        assert!(Value::from(1).as_object().is_none());
    }

    #[test]
    fn set_scalar_in_place() {
        let mut value = Value::from(1);
        if let Value::Int(n) = &mut value {
            *n = 10;
        }
        assert_eq!(value.as_int(), Some(10));
    }

    #[test]
    fn container_accessors() {
        let mut value = Value::from(Array::new());
        value.as_array_mut().unwrap().append(1);
        assert_eq!(value.as_array().unwrap().len(), 1);

        let object = Value::from(Object::new().with_field("k", "v"));
        let object = object.into_object().unwrap();
        assert!(object.has_field("k"));
    }

    #[test]
    fn clone_is_independent() {
        let original = Value::from(Object::new().with_field(
            "list",
            Array::from_iter([Value::from(1), Value::from(2)]),
        ));
        let mut copy = original.clone();

        copy.as_object_mut()
            .unwrap()
            .find_mut("list")
            .unwrap()
            .value_mut()
            .as_array_mut()
            .unwrap()
            .append(3);

        let len_of = |v: &Value| {
            v.as_object()
                .and_then(|o| o.get("list"))
                .and_then(Value::as_array)
                .map(Array::len)
        };
        assert_eq!(len_of(&original), Some(2));
        assert_eq!(len_of(&copy), Some(3));
    }
}
