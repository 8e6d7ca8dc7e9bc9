/// Association of a group key with a value, produced once per cursor row.
///
/// Immutable once built; take it apart with [`KeyValue::into_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue<K, V> {
    key: K,
    value: V,
}

impl<K, V> KeyValue<K, V> {
    #[must_use]
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[must_use]
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KeyValue<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_key_and_value() {
        let kv = KeyValue::new(1, "Value");
        assert_eq!(*kv.key(), 1);
        assert_eq!(*kv.value(), "Value");
        assert_eq!(kv.into_parts(), (1, "Value"));
    }
}
