//! Ordered registry with an O(1) reverse index.
//!
//! Used for both sources and groups. The invariant maintained by every
//! operation is `items[index[e]] == e` for each tracked entity `e`.

use std::collections::HashMap;
use std::hash::Hash;

/// An insertion-ordered list of unique entities with a reverse index.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity.
    /// Returns false if it was already tracked.
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.contains_key(&item) {
            return false;
        }
        self.index.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Remove an entity and renumber everything after it.
    /// Returns false if it was not tracked.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(position) = self.index.remove(item) else {
            return false;
        };
        self.items.remove(position);
        for (offset, moved) in self.items[position..].iter().enumerate() {
            if let Some(slot) = self.index.get_mut(moved) {
                *slot = position + offset;
            }
        }
        true
    }

    /// Position of an entity in insertion order.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.index.get(item).copied()
    }

    /// Whether the entity is tracked.
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    /// First entity in insertion order.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// All entities in insertion order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove everything, returning the entities in their former order.
    pub fn drain(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.items)
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
