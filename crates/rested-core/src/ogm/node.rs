//! Node type tags shared by every element of a tree.

use std::fmt;

/// Type tag of a tree node.
///
/// `Bool` and `Undefined` are part of the tag space but no value variant
/// currently carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Undefined,
    Field,
    Int,
    Real,
    String,
    Bool,
    Array,
    Object,
}

impl NodeType {
    /// Returns a lower-case name for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Field => "field",
            Self::Int => "int",
            Self::Real => "real",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common behaviour of every tree element.
///
/// The tag is derived from the concrete variant, so it can never disagree
/// with what the node actually holds.
pub trait Node {
    /// Returns the type tag of this node.
    fn node_type(&self) -> NodeType;

    fn is_int(&self) -> bool {
        self.node_type() == NodeType::Int
    }

    fn is_real(&self) -> bool {
        self.node_type() == NodeType::Real
    }

    fn is_string(&self) -> bool {
        self.node_type() == NodeType::String
    }

    fn is_bool(&self) -> bool {
        self.node_type() == NodeType::Bool
    }

    fn is_array(&self) -> bool {
        self.node_type() == NodeType::Array
    }

    fn is_object(&self) -> bool {
        self.node_type() == NodeType::Object
    }

    fn is_field(&self) -> bool {
        self.node_type() == NodeType::Field
    }
}
