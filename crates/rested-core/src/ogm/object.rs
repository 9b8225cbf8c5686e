//! Ordered sequence of owned fields.

use std::slice;

use super::{Field, Node, NodeType, Value};

/// An ordered sequence of exclusively-owned fields.
///
/// Field names are not required to be unique; name lookups scan in
/// insertion order and return the first match. Absence is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    fields: Vec<Field>,
}

impl Object {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Field::new(name, value));
        self
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the object holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields in insertion order.
    pub fn fields(&self) -> slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn fields_mut(&mut self) -> slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }

    /// Returns the field at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn field(&self, index: usize) -> &Field {
        self.check_index(index);
        &self.fields[index]
    }

    /// Returns true if any field is called `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    /// Returns the first field called `name`.
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Returns the position of the first field called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Returns the value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(Field::value)
    }

    /// Appends a field. Always succeeds.
    pub fn insert(&mut self, field: Field) -> bool {
        self.fields.push(field);
        true
    }

    /// Removes and drops the field at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn remove(&mut self, index: usize) {
        self.release(index);
    }

    /// Removes the field at `index` and hands it back to the caller.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn release(&mut self, index: usize) -> Field {
        self.check_index(index);
        self.fields.remove(index)
    }

    /// Puts `field` at `index` and returns the field it displaced.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn replace(&mut self, index: usize, field: Field) -> Field {
        self.check_index(index);
        std::mem::replace(&mut self.fields[index], field)
    }

    /// Removes all fields.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    #[track_caller]
    fn check_index(&self, index: usize) {
        if index >= self.fields.len() {
            panic!(
                "index out of range: the index is {index} but the object size is {}",
                self.fields.len()
            );
        }
    }
}

impl Node for Object {
    fn node_type(&self) -> NodeType {
        NodeType::Object
    }
}

impl FromIterator<Field> for Object {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<Field> for Object {
    fn extend<I: IntoIterator<Item = Field>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a Field;
    type IntoIter = slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for Object {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
