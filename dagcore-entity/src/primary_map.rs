//! A dense arena keyed by entity handle: the canonical owner of every
//! value it stores.

use crate::EntityRef;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// A mapping from `K` to `V`, where every `K` that has ever been handed
/// out by [`PrimaryMap::push`] is guaranteed to have a value.
///
/// Unlike a `HashMap`, insertion order is the only order: there is no
/// way to remove an entry, only to overwrite or logically retire it via
/// whatever tombstone convention `V` defines for itself.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "enable-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(serialize = "V: serde::Serialize", deserialize = "V: serde::Deserialize<'de>"))
)]
pub struct PrimaryMap<K, V>
where
    K: EntityRef,
{
    elems: Vec<V>,
    unused: PhantomData<K>,
}

impl<K, V> PrimaryMap<K, V>
where
    K: EntityRef,
{
    /// Create a new, empty map.
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            unused: PhantomData,
        }
    }

    /// Create a new, empty map with space reserved for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elems: Vec::with_capacity(capacity),
            unused: PhantomData,
        }
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Insert `value`, returning the handle that now owns it.
    pub fn push(&mut self, value: V) -> K {
        let key = K::new(self.elems.len());
        self.elems.push(value);
        key
    }

    /// Get a reference to the value for `key`, if `key` is in range.
    pub fn get(&self, key: K) -> Option<&V> {
        self.elems.get(key.index())
    }

    /// Get a mutable reference to the value for `key`, if `key` is in range.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.elems.get_mut(key.index())
    }

    /// Iterate over `(key, &value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.elems
            .iter()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }

    /// Iterate over `(key, &mut value)` pairs in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> {
        self.elems
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        (0..self.elems.len()).map(K::new)
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.elems.iter()
    }
}

impl<K, V> Default for PrimaryMap<K, V>
where
    K: EntityRef,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IntoIterator for PrimaryMap<K, V>
where
    K: EntityRef,
{
    type Item = (K, V);
    type IntoIter = std::iter::Map<
        std::iter::Enumerate<std::vec::IntoIter<V>>,
        fn((usize, V)) -> (K, V),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.elems
            .into_iter()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }
}

impl<K, V> Index<K> for PrimaryMap<K, V>
where
    K: EntityRef,
{
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.elems[key.index()]
    }
}

impl<K, V> IndexMut<K> for PrimaryMap<K, V>
where
    K: EntityRef,
{
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.elems[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    struct K(u32);
    crate::entity_impl!(K);

    #[test]
    fn push_and_index_round_trip() {
        let mut map: PrimaryMap<K, &str> = PrimaryMap::new();
        let a = map.push("a");
        let b = map.push("b");
        assert_eq!(map[a], "a");
        assert_eq!(map[b], "b");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn keys_are_insertion_ordered() {
        let mut map: PrimaryMap<K, u32> = PrimaryMap::new();
        for i in 0..5 {
            map.push(i);
        }
        let collected: Vec<u32> = map.keys().map(|k| map[k]).collect();
        assert_eq!(collected, vec![0, 1, 2, 3, 4]);
    }

    #[cfg(feature = "enable-serde")]
    #[test]
    fn primary_map_derives_serde_impls_when_the_feature_is_on() {
        fn assert_serde<T: serde::Serialize + serde::de::DeserializeOwned>() {}
        assert_serde::<PrimaryMap<K, u32>>();
    }
}
