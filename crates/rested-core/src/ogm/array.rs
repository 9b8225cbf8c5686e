//! Ordered sequence of owned values.

use std::slice;

use super::{Node, NodeType, Value};

/// An ordered sequence of exclusively-owned values.
///
/// Insertion order is preserved. Positional operations (`value`, `insert`,
/// `remove`, `release`, `replace`) panic when the index is out of range;
/// use [`Array::get`] for a checked lookup.
///
/// The iterators returned by [`Array::values`] and [`Array::values_mut`]
/// borrow the live sequence, so the borrow checker rules out mutating the
/// array while one is outstanding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    values: Vec<Value>,
}

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn value(&self, index: usize) -> &Value {
        self.check_index(index);
        &self.values[index]
    }

    /// Returns the value at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn value_mut(&mut self, index: usize) -> &mut Value {
        self.check_index(index);
        &mut self.values[index]
    }

    /// Returns the value at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    /// Iterates over the elements in order.
    pub fn values(&self) -> slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> slice::IterMut<'_, Value> {
        self.values.iter_mut()
    }

    /// Appends a value at the end.
    pub fn append(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    /// Inserts a value before position `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) {
        if index > self.values.len() {
            panic!(
                "index out of range: cannot insert at {index}, array size is {}",
                self.values.len()
            );
        }
        self.values.insert(index, value.into());
    }

    /// Removes and drops the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn remove(&mut self, index: usize) {
        self.release(index);
    }

    /// Removes the value at `index` and hands it back to the caller.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn release(&mut self, index: usize) -> Value {
        self.check_index(index);
        self.values.remove(index)
    }

    /// Puts `value` at `index` and returns the value it displaced.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[track_caller]
    pub fn replace(&mut self, index: usize, value: impl Into<Value>) -> Value {
        self.check_index(index);
        std::mem::replace(&mut self.values[index], value.into())
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[track_caller]
    fn check_index(&self, index: usize) {
        if index >= self.values.len() {
            panic!(
                "index out of range: the index is {index} but the array size is {}",
                self.values.len()
            );
        }
    }
}

impl Node for Array {
    fn node_type(&self) -> NodeType {
        NodeType::Array
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Extend<Value> for Array {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
