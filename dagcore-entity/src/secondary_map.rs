//! A map from entity handle to auxiliary data, backed by a dense `Vec`
//! that grows lazily and answers with a default value for any key it
//! hasn't seen yet.

use crate::EntityRef;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// A mapping from `K` to `V` that never fails to answer a query: any key
/// beyond the current backing storage reads as `V::default()`.
///
/// Use this for data that rides alongside entries in a
/// [`PrimaryMap`](crate::PrimaryMap) but that most entries don't need,
/// e.g. a "has this node been visited" flag.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "enable-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(serialize = "V: serde::Serialize", deserialize = "V: serde::Deserialize<'de>"))
)]
pub struct SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    elems: Vec<V>,
    default: V,
    unused: PhantomData<K>,
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    /// Create a new, empty map whose default value is `V::default()`.
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            default: V::default(),
            unused: PhantomData,
        }
    }

    /// Create a new, empty map whose default value is `default`.
    pub fn with_default(default: V) -> Self {
        Self {
            elems: Vec::new(),
            default,
            unused: PhantomData,
        }
    }

    /// Get the value for `key`, or the map's default if `key` hasn't
    /// been written to yet.
    pub fn get(&self, key: K) -> &V {
        self.elems.get(key.index()).unwrap_or(&self.default)
    }

    /// Set the value for `key`, growing the backing storage (filling
    /// any gap with the default) as needed.
    pub fn set(&mut self, key: K, value: V) {
        let index = key.index();
        if index >= self.elems.len() {
            self.elems.resize(index + 1, self.default.clone());
        }
        self.elems[index] = value;
    }

    /// Number of entries with explicitly-written storage. Keys at or
    /// beyond this length still answer with the default on `get`.
    pub fn len(&self) -> usize {
        self.elems.len()
    }
}

impl<K, V> Default for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Index<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    type Output = V;

    fn index(&self, key: K) -> &V {
        self.get(key)
    }
}

impl<K, V> IndexMut<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    fn index_mut(&mut self, key: K) -> &mut V {
        let index = key.index();
        if index >= self.elems.len() {
            self.elems.resize(index + 1, self.default.clone());
        }
        &mut self.elems[index]
    }
}
