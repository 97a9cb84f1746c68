//! Semantic maps - mappings keyed by canonical structural encoding.

use std::collections::BTreeMap;

use super::SemanticKey;

/// A map whose keys are compared by [`SemanticKey`] encoding.
///
/// Lookups accept any value encoding the same way as the stored key, so a
/// `SemanticMap<String, _>` can be queried with a `&str`.
#[derive(Debug, Clone)]
pub struct SemanticMap<K, V> {
    entries: BTreeMap<String, (K, V)>,
}

impl<K, V> Default for SemanticMap<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: SemanticKey, V> SemanticMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries
            .insert(key.semantic_key(), (key, value))
            .map(|(_, old)| old)
    }

    /// Look up a value.
    pub fn get<Q: SemanticKey + ?Sized>(&self, key: &Q) -> Option<&V> {
        self.entries.get(&key.semantic_key()).map(|(_, value)| value)
    }

    /// Look up a value mutably.
    pub fn get_mut<Q: SemanticKey + ?Sized>(&mut self, key: &Q) -> Option<&mut V> {
        self.entries
            .get_mut(&key.semantic_key())
            .map(|(_, value)| value)
    }

    /// Get the value for `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        &mut self
            .entries
            .entry(key.semantic_key())
            .or_insert_with(|| (key, make()))
            .1
    }

    /// Remove a value.
    pub fn remove<Q: SemanticKey + ?Sized>(&mut self, key: &Q) -> Option<V> {
        self.entries
            .remove(&key.semantic_key())
            .map(|(_, value)| value)
    }

    /// Whether `key` is present.
    pub fn contains_key<Q: SemanticKey + ?Sized>(&self, key: &Q) -> bool {
        self.entries.contains_key(&key.semantic_key())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    /// Iterate over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.values().map(|(key, _)| key)
    }

    /// Iterate over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, value)| value)
    }

    /// Iterate over values mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().map(|(_, value)| value)
    }
}

impl<K: SemanticKey, V> FromIterator<(K, V)> for SemanticMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
