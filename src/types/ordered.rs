//! Insertion-ordered set and map.
//!
//! The sequence memory enumerates active cells, winner cells and segments in the
//! order they were produced, so iteration order must be creation order rather
//! than hash or sorted order. Both containers pair a `Vec` (order) with an
//! `AHash` index (membership).

use ahash::{AHashMap, AHashSet};
use std::hash::Hash;

/// A set that iterates in insertion order.
#[derive(Debug, Clone)]
pub struct OrderedSet<T: Copy + Eq + Hash> {
    items: Vec<T>,
    index: AHashSet<T>,
}

impl<T: Copy + Eq + Hash> OrderedSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: AHashSet::new(),
        }
    }

    /// Creates an empty set with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            index: AHashSet::with_capacity(capacity),
        }
    }

    /// Inserts `item`, returning `false` if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.insert(item) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// Removes `item`, preserving the order of the remaining items.
    pub fn remove(&mut self, item: &T) -> bool {
        if self.index.remove(item) {
            if let Some(pos) = self.items.iter().position(|x| x == item) {
                self.items.remove(pos);
            }
            true
        } else {
            false
        }
    }

    /// Returns true if `item` is in the set.
    #[inline]
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains(item)
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Items in insertion order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Items copied out and sorted ascending.
    pub fn to_sorted_vec(&self) -> Vec<T>
    where
        T: Ord,
    {
        let mut v = self.items.clone();
        v.sort_unstable();
        v
    }
}

impl<T: Copy + Eq + Hash> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Copy + Eq + Hash> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T: Copy + Eq + Hash> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, T: Copy + Eq + Hash> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A map that iterates in key insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMap<K: Copy + Eq + Hash, V> {
    keys: Vec<K>,
    values: AHashMap<K, V>,
}

impl<K: Copy + Eq + Hash, V> OrderedMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: AHashMap::new(),
        }
    }

    /// Inserts a value, keeping the original position of an existing key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.values.insert(key, value);
        if old.is_none() {
            self.keys.push(key);
        }
        old
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        if !self.values.contains_key(&key) {
            self.keys.push(key);
        }
        self.values.entry(key).or_default()
    }

    /// Returns the value for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Returns true if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    #[inline]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.keys.iter().filter_map(move |k| self.values.get(k).map(|v| (*k, v)))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }
}

impl<K: Copy + Eq + Hash, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

// Serialized as plain sequences; the hash index is rebuilt on load.
#[cfg(feature = "serde")]
mod serde_impl {
    use super::{OrderedMap, OrderedSet};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::hash::Hash;

    impl<T> Serialize for OrderedSet<T>
    where
        T: Copy + Eq + Hash + Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.items.serialize(serializer)
        }
    }

    impl<'de, T> Deserialize<'de> for OrderedSet<T>
    where
        T: Copy + Eq + Hash + Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let items = Vec::<T>::deserialize(deserializer)?;
            Ok(items.into_iter().collect())
        }
    }

    impl<K, V> Serialize for OrderedMap<K, V>
    where
        K: Copy + Eq + Hash + Serialize,
        V: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let pairs: Vec<(K, &V)> = self.iter().collect();
            pairs.serialize(serializer)
        }
    }

    impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
    where
        K: Copy + Eq + Hash + Deserialize<'de>,
        V: Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
            let mut map = OrderedMap::new();
            for (k, v) in pairs {
                map.insert(k, v);
            }
            Ok(map)
        }
    }
}
