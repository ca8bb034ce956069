//! Map façade over the dense table engine.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
};

use crate::{dense_table, dense_table::DenseTable, hash::DefaultBuildHasher, key_spec::PairKey};

/// Hash map over a contiguous bucket array with caller-reserved sentinel
/// keys.
///
/// [`set_empty_key`][Self::set_empty_key] must be called with a key that is
/// never inserted before the map is used; removal additionally requires
/// [`set_deleted_key`][Self::set_deleted_key]. See [`DenseTable`] for the
/// underlying mechanics.
///
/// # Examples
///
/// ```
/// use compact_table::DenseMap;
///
/// let mut map: DenseMap<u64, &str> = DenseMap::new();
/// map.set_empty_key(u64::MAX);
///
/// assert_eq!(map.insert(3, "three"), None);
/// assert_eq!(map.insert(3, "tres"), Some((3, "tres")));
/// assert_eq!(map.get(&3), Some(&"three"));
/// ```
pub struct DenseMap<K: Hash + Eq, V, S = DefaultBuildHasher> {
    table: DenseTable<PairKey<K, V>, S>,
}

impl<K: Hash + Eq, V, S: Default> Default for DenseMap<K, V, S> {
    fn default() -> Self {
        DenseMap {
            table: Default::default(),
        }
    }
}

impl<K: Hash + Eq, V> DenseMap<K, V> {
    /// Returns an empty map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty map sized to hold at least `expected` entries
    /// without growing.
    pub fn with_capacity(expected: usize) -> Self {
        DenseMap {
            table: DenseTable::with_capacity(expected),
        }
    }
}

impl<K: Hash + Eq, V, S> DenseMap<K, V, S> {
    /// Returns an empty map with the provided build hasher.
    pub fn with_hasher(build_hasher: S) -> Self {
        DenseMap {
            table: DenseTable::with_hasher(build_hasher),
        }
    }

    /// Returns an empty map with the specified capacity and build hasher.
    pub fn with_capacity_and_hasher(expected: usize, build_hasher: S) -> Self {
        DenseMap {
            table: DenseTable::with_capacity_and_hasher(expected, build_hasher),
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

    /// Returns the key reserved to mark empty buckets, if set.
    pub fn empty_key(&self) -> Option<&K> {
        self.table.empty_value().map(|entry| &entry.0)
    }

    /// Returns the key reserved to mark deleted buckets, if set.
    pub fn deleted_key(&self) -> Option<&K> {
        self.table.deleted_key()
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

impl<K: Hash + Eq + Clone, V, S: BuildHasher> DenseMap<K, V, S> {
    /// Reserves `key` to mark empty buckets. Must be called once before the
    /// map is used; the key can never be inserted.
    pub fn set_empty_key(&mut self, key: K)
    where
        V: Default + Clone,
    {
        self.table.set_empty_value((key, V::default()));
    }

    /// Reserves `key` to mark deleted buckets, enabling
    /// [`remove`][Self::remove]; the key can never be inserted.
    pub fn set_deleted_key(&mut self, key: K)
    where
        V: Clone,
    {
        self.table.set_deleted_key(key);
    }

    /// Removes the deleted key reservation, making the map insert-only.
    pub fn clear_deleted_key(&mut self)
    where
        V: Clone,
    {
        self.table.clear_deleted_key();
    }

    /// Inserts `key -> value` unless the key is already present.
    ///
    /// The map keeps at most one entry per key: when `key` is already bound,
    /// the map is unchanged and the rejected pair is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)>
    where
        V: Clone,
    {
        self.table.insert((key, value)).1
    }

    /// Removes the entry stored under `key`, returning `true` if one
    /// existed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.table.remove(key)
    }

    /// Drops all entries and resets the map to its minimum size.
    pub fn clear(&mut self)
    where
        V: Clone,
    {
        self.table.clear();
    }

    /// Drops all entries while keeping the bucket count unchanged.
    pub fn clear_no_resize(&mut self)
    where
        V: Clone,
    {
        self.table.clear_no_resize();
    }

    /// Grows the map so at least `target` entries fit without another
    /// resize. `resize(0)` merely applies any pending shrink.
    pub fn resize(&mut self, target: usize)
    where
        V: Clone,
    {
        self.table.resize(target);
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> DenseMap<K, V, S> {
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

    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.table.check();
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: BuildHasher> Extend<(K, V)> for DenseMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: Clone> Clone for DenseMap<K, V, S> {
    fn clone(&self) -> Self {
        DenseMap {
            table: self.table.clone(),
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug, S> fmt::Debug for DenseMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for DenseMap<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<'a, K: Hash + Eq, V, S> IntoIterator for &'a DenseMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator yielding a map's entries as key and payload references.
pub struct Iter<'a, K: Hash + Eq, V: 'a> {
    inner: dense_table::Iter<'a, PairKey<K, V>>,
}

impl<'a, K: Hash + Eq, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (&entry.0, &entry.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Iterator yielding a map's entries with mutable payload references.
pub struct IterMut<'a, K: Hash + Eq, V: 'a> {
    inner: dense_table::IterMut<'a, PairKey<K, V>>,
}

impl<'a, K: Hash + Eq, V> Iterator for IterMut<'a, K, V> {
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
