//! Name/value pairs held by objects.

use super::{Node, NodeType, Value};

/// A named value inside an [`Object`](super::Object).
///
/// The name is fixed at construction; the value can be swapped out.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: Value,
}

impl Field {
    /// Creates a field owning `value`.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value held by this field.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Sets a new value, dropping the old one.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    /// Sets a new value and returns the old one.
    pub fn replace_value(&mut self, value: impl Into<Value>) -> Value {
        std::mem::replace(&mut self.value, value.into())
    }

    /// Consumes the field, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Consumes the field, returning its name and value.
    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.value)
    }
}

impl Node for Field {
    fn node_type(&self) -> NodeType {
        NodeType::Field
    }
}
