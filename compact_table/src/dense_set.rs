//! Set façade over the dense table engine.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    io::{self, Read, Write},
};

use bytemuck::{AnyBitPattern, NoUninit};

use crate::{dense_table, dense_table::DenseTable, hash::DefaultBuildHasher, key_spec::SelfKey};

/// Hash set over a contiguous bucket array with caller-reserved sentinel
/// keys.
///
/// [`set_empty_key`][Self::set_empty_key] must be called with a key that is
/// never inserted before the set is used; removal additionally requires
/// [`set_deleted_key`][Self::set_deleted_key]. See
/// [`DenseTable`] for the underlying mechanics.
///
/// # Examples
///
/// ```
/// use compact_table::DenseSet;
///
/// let mut set: DenseSet<i64> = DenseSet::new();
/// set.set_empty_key(-1);
/// set.set_deleted_key(-2);
///
/// assert!(set.insert(10));
/// assert!(!set.insert(10));
/// assert!(set.contains(&10));
/// assert!(set.remove(&10));
/// assert!(set.is_empty());
/// ```
pub struct DenseSet<K: Hash + Eq, S = DefaultBuildHasher> {
    table: DenseTable<SelfKey<K>, S>,
}

impl<K: Hash + Eq, S: Default> Default for DenseSet<K, S> {
    fn default() -> Self {
        DenseSet {
            table: Default::default(),
        }
    }
}

impl<K: Hash + Eq> DenseSet<K> {
    /// Returns an empty set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty set sized to hold at least `expected` elements
    /// without growing.
    pub fn with_capacity(expected: usize) -> Self {
        DenseSet {
            table: DenseTable::with_capacity(expected),
        }
    }
}

impl<K: Hash + Eq, S> DenseSet<K, S> {
    /// Returns an empty set with the provided build hasher.
    pub fn with_hasher(build_hasher: S) -> Self {
        DenseSet {
            table: DenseTable::with_hasher(build_hasher),
        }
    }

    /// Returns an empty set with the specified capacity and build hasher.
    pub fn with_capacity_and_hasher(expected: usize, build_hasher: S) -> Self {
        DenseSet {
            table: DenseTable::with_capacity_and_hasher(expected, build_hasher),
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

    /// Returns the key reserved to mark empty buckets, if set.
    pub fn empty_key(&self) -> Option<&K> {
        self.table.empty_value()
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

    /// Returns an iterator over the elements, in unspecified order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<K: Hash + Eq + Clone, S: BuildHasher> DenseSet<K, S> {
    /// Reserves `key` to mark empty buckets. Must be called once before the
    /// set is used; the key can never be inserted.
    pub fn set_empty_key(&mut self, key: K) {
        self.table.set_empty_value(key);
    }

    /// Reserves `key` to mark deleted buckets, enabling
    /// [`remove`][Self::remove]; the key can never be inserted.
    pub fn set_deleted_key(&mut self, key: K) {
        self.table.set_deleted_key(key);
    }

    /// Removes the deleted key reservation, making the set insert-only.
    pub fn clear_deleted_key(&mut self) {
        self.table.clear_deleted_key();
    }

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

    /// Drops all elements and resets the set to its minimum size.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Drops all elements while keeping the bucket count unchanged.
    pub fn clear_no_resize(&mut self) {
        self.table.clear_no_resize();
    }

    /// Grows the set so at least `target` elements fit without another
    /// resize. `resize(0)` merely applies any pending shrink.
    pub fn resize(&mut self, target: usize) {
        self.table.resize(target);
    }
}

impl<K: Hash + Eq, S: BuildHasher> DenseSet<K, S> {
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

    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.table.check();
    }
}

impl<K: Hash + Eq + Clone, S: BuildHasher> Extend<K> for DenseSet<K, S> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: Hash + Eq + Clone, S: Clone> Clone for DenseSet<K, S> {
    fn clone(&self) -> Self {
        DenseSet {
            table: self.table.clone(),
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, S> fmt::Debug for DenseSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

impl<K: Hash + Eq, S: BuildHasher> PartialEq for DenseSet<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<'a, K: Hash + Eq, S> IntoIterator for &'a DenseSet<K, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq + Clone + NoUninit, S: BuildHasher> DenseSet<K, S> {
    /// Writes the set's shape; see [`DenseTable::write_metadata`].
    pub fn write_metadata<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.table.write_metadata(writer)
    }

    /// Writes the bucket contents; see [`DenseTable::write_nopointer_data`].
    pub fn write_nopointer_data<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.table.write_nopointer_data(writer)
    }
}

impl<K: Hash + Eq + Clone + NoUninit + AnyBitPattern, S: BuildHasher> DenseSet<K, S> {
    /// Restores the set's shape; see [`DenseTable::read_metadata`].
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        self.table.read_metadata(reader)
    }

    /// Restores the bucket contents; see
    /// [`DenseTable::read_nopointer_data`].
    pub fn read_nopointer_data<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        self.table.read_nopointer_data(reader)
    }
}

/// Iterator yielding references to a set's elements.
pub struct Iter<'a, K: Hash + Eq> {
    inner: dense_table::Iter<'a, SelfKey<K>>,
}

impl<'a, K: Hash + Eq> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
