//! Map façade over the sparse table engine.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
};

use sparse_vec::{Values, ValuesMut};

use crate::{hash::DefaultBuildHasher, key_spec::PairKey, sparse_table::SparseTable};

/// Hash map over sparse bucket storage.
///
/// Memory per empty bucket is a few bits instead of a full entry, making this
/// the map of choice for large, sparsely filled key spaces. No sentinel keys
/// are reserved; the whole key space is usable. See [`SparseTable`] for the
/// underlying mechanics.
///
/// Persistence for maps goes through the engine with a caller-defined
/// pointer-free record type, since a generic key/payload pair cannot promise
/// a padding-free byte layout.
///
/// # Examples
///
/// ```
/// use compact_table::SparseMap;
///
/// let mut map: SparseMap<&str, u32> = SparseMap::new();
/// assert_eq!(map.insert("one", 1), None);
/// assert_eq!(map.insert("one", 11), Some(("one", 11)));
/// assert_eq!(map.get("one"), Some(&1));
/// *map.get_mut("one").unwrap() += 1;
/// assert_eq!(map.get("one"), Some(&2));
/// ```
pub struct SparseMap<K: Hash + Eq, V, S = DefaultBuildHasher> {
    table: SparseTable<PairKey<K, V>, S>,
}

impl<K: Hash + Eq, V, S: Default> Default for SparseMap<K, V, S> {
    fn default() -> Self {
        SparseMap {
            table: Default::default(),
        }
    }
}

impl<K: Hash + Eq, V> SparseMap<K, V> {
    /// Returns an empty map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty map sized to hold at least `expected` entries
    /// without growing.
    pub fn with_capacity(expected: usize) -> Self {
        SparseMap {
            table: SparseTable::with_capacity(expected),
        }
    }
}

impl<K: Hash + Eq, V, S> SparseMap<K, V, S> {
    /// Returns an empty map with the provided build hasher.
    pub fn with_hasher(build_hasher: S) -> Self {
        SparseMap {
            table: SparseTable::with_hasher(build_hasher),
        }
    }

    /// Returns an empty map with the specified capacity and build hasher.
    pub fn with_capacity_and_hasher(expected: usize, build_hasher: S) -> Self {
        SparseMap {
            table: SparseTable::with_capacity_and_hasher(expected, build_hasher),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns the current `(shrink, enlarge)` resize fractions.
    pub fn resizing_parameters(&self) -> (f64, f64) {
        self.table.resizing_parameters()
    }

    /// Sets the load fractions that trigger growing and shrinking.
    pub fn set_resizing_parameters(&mut self, shrink: f64, grow: f64) {
        self.table.set_resizing_parameters(shrink, grow);
    }

    /// Returns an iterator over the entries, in unspecified order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the entries yielding mutable payload
    /// references.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys, in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the payloads, in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Returns an iterator yielding mutable references to the payloads.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.iter_mut().map(|(_, value)| value)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> SparseMap<K, V, S> {
    /// Inserts `key -> value` unless the key is already present.
    ///
    /// The map keeps at most one entry per key: when `key` is already bound,
    /// the map is unchanged and the rejected pair is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.table.insert((key, value)).1
    }

    /// Removes the entry stored under `key`, returning `true` if one
    /// existed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.contains(key)
    }

    /// Returns a reference to the payload stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).map(|entry| &entry.1)
    }

    /// Returns the stored key and payload for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).map(|entry| (&entry.0, &entry.1))
    }

    /// Returns a mutable reference to the payload stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_mut(key).map(|entry| &mut entry.1)
    }

    /// Drops all entries and resets the map to its minimum size.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Grows the map so at least `target` entries fit without another
    /// resize. `resize(0)` merely applies any pending shrink.
    pub fn resize(&mut self, target: usize) {
        self.table.resize(target);
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.table.check();
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for SparseMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Default> FromIterator<(K, V)> for SparseMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SparseMap::default();
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: Clone> Clone for SparseMap<K, V, S> {
    fn clone(&self) -> Self {
        SparseMap {
            table: self.table.clone(),
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug, S> fmt::Debug for SparseMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for SparseMap<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<'a, K: Hash + Eq, V, S> IntoIterator for &'a SparseMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator yielding a map's entries as key and payload references.
pub struct Iter<'a, K, V> {
    inner: Values<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (&entry.0, &entry.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator yielding a map's entries with mutable payload references.
pub struct IterMut<'a, K, V> {
    inner: ValuesMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| {
            let (key, value) = entry;
            (&*key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
