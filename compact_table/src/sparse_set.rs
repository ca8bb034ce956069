//! Set façade over the sparse table engine.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    io::{self, Read, Write},
};

use bytemuck::{AnyBitPattern, NoUninit};
use sparse_vec::Values;

use crate::{hash::DefaultBuildHasher, key_spec::SelfKey, sparse_table::SparseTable};

/// Hash set over sparse bucket storage.
///
/// Memory per empty bucket is a few bits instead of a full element, making
/// this the set of choice for large, sparsely filled key spaces. No sentinel
/// keys are reserved; the whole key space is usable. See
/// [`SparseTable`] for the underlying mechanics.
///
/// # Examples
///
/// ```
/// use compact_table::SparseSet;
///
/// let mut set: SparseSet<u64> = (0..100).collect();
/// assert_eq!(set.len(), 100);
/// assert!(set.contains(&42));
/// assert!(set.remove(&42));
/// assert!(!set.contains(&42));
/// ```
pub struct SparseSet<K: Hash + Eq, S = DefaultBuildHasher> {
    table: SparseTable<SelfKey<K>, S>,
}

impl<K: Hash + Eq, S: Default> Default for SparseSet<K, S> {
    fn default() -> Self {
        SparseSet {
            table: Default::default(),
        }
    }
}

impl<K: Hash + Eq> SparseSet<K> {
    /// Returns an empty set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty set sized to hold at least `expected` elements
    /// without growing.
    pub fn with_capacity(expected: usize) -> Self {
        SparseSet {
            table: SparseTable::with_capacity(expected),
        }
    }
}

impl<K: Hash + Eq, S> SparseSet<K, S> {
    /// Returns an empty set with the provided build hasher.
    pub fn with_hasher(build_hasher: S) -> Self {
        SparseSet {
            table: SparseTable::with_hasher(build_hasher),
        }
    }

    /// Returns an empty set with the specified capacity and build hasher.
    pub fn with_capacity_and_hasher(expected: usize, build_hasher: S) -> Self {
        SparseSet {
            table: SparseTable::with_capacity_and_hasher(expected, build_hasher),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set has no elements.
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

    /// Returns an iterator over the elements, in unspecified order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<K: Hash + Eq, S: BuildHasher> SparseSet<K, S> {
    /// Adds `key` to the set, returning `true` if it was not yet present.
    pub fn insert(&mut self, key: K) -> bool {
        self.table.insert(key).1.is_none()
    }

    /// Removes `key` from the set, returning `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Returns `true` if `key` is in the set.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.contains(key)
    }

    /// Returns a reference to the element equal to `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key)
    }

    /// Drops all elements and resets the set to its minimum size.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Grows the set so at least `target` elements fit without another
    /// resize. `resize(0)` merely applies any pending shrink.
    pub fn resize(&mut self, target: usize) {
        self.table.resize(target);
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.table.check();
    }
}

impl<K: Hash + Eq, S: BuildHasher> Extend<K> for SparseSet<K, S> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: Hash + Eq, S: BuildHasher + Default> FromIterator<K> for SparseSet<K, S> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = SparseSet::default();
        set.extend(iter);
        set
    }
}

impl<K: Hash + Eq + Clone, S: Clone> Clone for SparseSet<K, S> {
    fn clone(&self) -> Self {
        SparseSet {
            table: self.table.clone(),
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, S> fmt::Debug for SparseSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

impl<K: Hash + Eq, S: BuildHasher> PartialEq for SparseSet<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<'a, K: Hash + Eq, S> IntoIterator for &'a SparseSet<K, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, S: BuildHasher> SparseSet<K, S> {
    /// Writes the set's structure; see [`SparseTable::write_metadata`].
    pub fn write_metadata<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.table.write_metadata(writer)
    }

    /// Restores the set's structure; see [`SparseTable::read_metadata`].
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        K: AnyBitPattern,
    {
        self.table.read_metadata(reader)
    }

    /// Writes the elements as raw bytes; see
    /// [`SparseTable::write_nopointer_data`].
    pub fn write_nopointer_data<W: Write>(&self, writer: &mut W) -> io::Result<()>
    where
        K: NoUninit,
    {
        self.table.write_nopointer_data(writer)
    }

    /// Restores the elements from raw bytes; see
    /// [`SparseTable::read_nopointer_data`].
    pub fn read_nopointer_data<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        K: NoUninit + AnyBitPattern,
    {
        self.table.read_nopointer_data(reader)
    }
}

/// Iterator yielding references to a set's elements.
pub struct Iter<'a, K> {
    inner: Values<'a, K>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}
