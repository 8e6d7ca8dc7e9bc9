use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use super::key_value::KeyValue;

/// A parent key together with its children, in the order the rows were read.
///
/// An empty `children` list is a real group: it is what a left join row with
/// no matching child produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, V> {
    pub key: K,
    pub children: Vec<V>,
}

/// Accumulates `parent -> ordered children` groups from a flat row stream.
///
/// Built fresh for each normalization pass and consumed by [`OneToMany::collect`].
/// The order in which distinct keys are enumerated is unspecified; the order
/// of children within a key always follows insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToMany<K, V>
where
    K: Eq + Hash,
{
    data: HashMap<K, Vec<V>>,
}

impl<K, V> Default for OneToMany<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<K, V> OneToMany<K, V>
where
    K: Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row's key and optional child.
    pub fn put(&mut self, key_value: KeyValue<K, Option<V>>) {
        let (key, value) = key_value.into_parts();
        self.insert(key, value);
    }

    /// Register `key` and append `value` to its children when present.
    ///
    /// An absent value still registers the key, so parents without children
    /// survive as empty groups instead of being dropped.
    pub fn insert(&mut self, key: K, value: Option<V>) {
        let children = match self.data.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Vec::new()),
        };
        if let Some(value) = value {
            children.push(value);
        }
    }

    /// Children recorded so far for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Materialise one `T` per distinct key through `combine`.
    pub fn collect<T, F>(self, mut combine: F) -> Vec<T>
    where
        F: FnMut(K, Vec<V>) -> T,
    {
        self.data
            .into_iter()
            .map(|(key, children)| combine(key, children))
            .collect()
    }

    #[must_use]
    pub fn into_groups(self) -> Vec<Group<K, V>> {
        self.collect(|key, children| Group { key, children })
    }
}

impl<K, V> Extend<KeyValue<K, Option<V>>> for OneToMany<K, V>
where
    K: Eq + Hash,
{
    fn extend<I: IntoIterator<Item = KeyValue<K, Option<V>>>>(&mut self, iter: I) {
        for key_value in iter {
            self.put(key_value);
        }
    }
}

impl<K, V> FromIterator<KeyValue<K, Option<V>>> for OneToMany<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = KeyValue<K, Option<V>>>>(iter: I) -> Self {
        let mut one_to_many = Self::new();
        one_to_many.extend(iter);
        one_to_many
    }
}
