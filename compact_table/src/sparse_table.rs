//! Open addressed hash table over sparse bucket storage.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    io::{self, Read, Write},
    mem::size_of,
};

use bytemuck::{AnyBitPattern, NoUninit};
use sparse_vec::{SparseVec, Values, ValuesMut};

use crate::{
    hash::DefaultBuildHasher,
    key_spec::KeySpec,
    settings::{ProbeSeq, Settings, MIN_BUCKETS},
};

/// Hash table engine storing its buckets in a [`SparseVec`].
///
/// Empty buckets cost only their presence bit in the sparse vector's group
/// bitmaps, making this the engine of choice when memory matters more than
/// raw probe speed. Unlike [`DenseTable`][crate::DenseTable] no key values
/// are reserved: a bucket is *empty* when its sparse slot is absent, and
/// erased buckets are recorded in a parallel bitmap of *deleted* marks while
/// their value is dropped immediately. Erasing therefore needs no prior
/// configuration and the whole key space is usable.
///
/// Probing, growth and shrink behavior are shared with the dense engine:
/// quadratic probing over a power of two bucket count, growth ahead of the
/// occupancy threshold, lazy shrinking after erases, and tombstone discarding
/// on every rebuild.
///
/// # Examples
///
/// ```
/// use compact_table::{key_spec::SelfKey, SparseTable};
///
/// let mut table: SparseTable<SelfKey<u32>> = SparseTable::new();
/// assert!(table.insert(17).1.is_none());
/// assert!(table.insert(17).1.is_some());
/// assert!(table.remove(&17));
/// assert_eq!(table.find(&17), None);
/// ```
pub struct SparseTable<P: KeySpec, S = DefaultBuildHasher> {
    settings: Settings,
    build_hasher: S,
    buckets: SparseVec<P::Value>,
    deleted: DeletedMarks,
    num_deleted: usize,
    /// Occupied plus deleted buckets; the live count is
    /// `num_elements - num_deleted`.
    num_elements: usize,
}

/// Word bitmap with one deleted mark per bucket.
///
/// A bucket is deleted iff its sparse slot is absent and its mark is set, so
/// a mark and a present value never coincide.
#[derive(Clone, Default)]
struct DeletedMarks {
    words: Vec<u64>,
}

impl DeletedMarks {
    fn with_len(len: usize) -> Self {
        DeletedMarks {
            words: vec![0; len.div_ceil(u64::BITS as usize)],
        }
    }

    #[inline(always)]
    fn test(&self, index: usize) -> bool {
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    #[inline(always)]
    fn set(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    #[inline(always)]
    fn clear(&mut self, index: usize) {
        self.words[index / 64] &= !(1 << (index % 64));
    }

    #[cfg(test)]
    fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }
}

impl<P: KeySpec, S: Default> Default for SparseTable<P, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<P: KeySpec> SparseTable<P> {
    /// Returns an empty table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty table sized to hold at least `expected` entries
    /// without growing.
    pub fn with_capacity(expected: usize) -> Self {
        Self::with_capacity_and_hasher(expected, Default::default())
    }
}

impl<P: KeySpec, S> SparseTable<P, S> {
    /// Returns an empty table with the provided build hasher.
    pub fn with_hasher(build_hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, build_hasher)
    }

    /// Returns an empty table with the specified capacity and build hasher.
    pub fn with_capacity_and_hasher(expected: usize, build_hasher: S) -> Self {
        let mut settings = Settings::default();
        let num_buckets = if expected == 0 {
            crate::settings::DEFAULT_STARTING_BUCKETS
        } else {
            settings.min_buckets(expected, 0)
        };
        settings.reset_thresholds(num_buckets);
        SparseTable {
            settings,
            build_hasher,
            buckets: SparseVec::with_len(num_buckets),
            deleted: DeletedMarks::with_len(num_buckets),
            num_deleted: 0,
            num_elements: 0,
        }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.num_elements - self.num_deleted
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current number of buckets, always a power of two.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of buckets that are not empty, deleted buckets
    /// included.
    pub fn nonempty_bucket_count(&self) -> usize {
        self.num_elements
    }

    /// Largest number of buckets the backing storage could ever hold.
    pub fn max_size(&self) -> usize {
        (isize::MAX as usize) / size_of::<P::Value>().max(1)
    }

    /// Returns the current `(shrink, enlarge)` resize fractions.
    pub fn resizing_parameters(&self) -> (f64, f64) {
        self.settings.fractions()
    }

    /// Sets the load fractions that trigger growing and shrinking.
    ///
    /// `shrink` is clamped to `grow / 2` to prevent resize thrashing; a
    /// `shrink` of zero disables shrinking.
    pub fn set_resizing_parameters(&mut self, shrink: f64, grow: f64) {
        self.settings
            .set_fractions(shrink, grow, self.buckets.len());
    }

    /// Returns an iterator over the live entries, in unspecified order.
    ///
    /// Deleted buckets hold no value, so this is exactly the sparse vector's
    /// present-value iteration.
    pub fn iter(&self) -> Values<'_, P::Value> {
        self.buckets.values()
    }

    /// Returns an iterator yielding mutable references to the live entries.
    ///
    /// Values may be mutated, but a value's key must stay equal to itself or
    /// the table becomes inconsistent.
    pub fn iter_mut(&mut self) -> ValuesMut<'_, P::Value> {
        self.buckets.values_mut()
    }
}

impl<P: KeySpec, S: BuildHasher> SparseTable<P, S> {
    /// Walks the probe sequence for `key`. Returns `Ok` with the bucket
    /// holding the key, or `Err` with the bucket an insert of it should use:
    /// the first tombstone seen, if any, so inserts reclaim deleted buckets.
    fn find_position<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mask = self.buckets.len() - 1;
        let mut probe = ProbeSeq::new(self.build_hasher.hash_one(key), mask);
        let mut insert_pos = None;
        let mut num_probes = 0;
        loop {
            let pos = probe.pos();
            match self.buckets.get(pos) {
                Some(value) => {
                    if P::key(value).borrow() == key {
                        return Ok(pos);
                    }
                }
                None if self.deleted.test(pos) => {
                    if insert_pos.is_none() {
                        insert_pos = Some(pos);
                    }
                }
                None => return Err(insert_pos.unwrap_or(pos)),
            }
            num_probes += 1;
            debug_assert!(
                num_probes < self.buckets.len(),
                "table is full, which the growth policy must prevent"
            );
            probe.advance();
        }
    }

    /// Returns a reference to the value stored under `key`.
    pub fn find<Q>(&self, key: &Q) -> Option<&P::Value>
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.len() == 0 {
            return None;
        }
        match self.find_position(key) {
            Ok(pos) => self.buckets.get(pos),
            Err(_) => None,
        }
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// The value may be mutated, but its key must stay equal to `key` or the
    /// table becomes inconsistent.
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut P::Value>
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.len() == 0 {
            return None;
        }
        match self.find_position(key) {
            Ok(pos) => self.buckets.get_mut(pos),
            Err(_) => None,
        }
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Inserts `value` unless a value with an equal key is already present.
    ///
    /// Returns a reference to the value stored under the key, together with
    /// the passed value if an equal key was already present (in which case
    /// the table is unchanged).
    pub fn insert(&mut self, value: P::Value) -> (&P::Value, Option<P::Value>) {
        self.resize_delta(1);
        self.insert_noresize(value)
    }

    fn insert_noresize(&mut self, value: P::Value) -> (&P::Value, Option<P::Value>) {
        match self.find_position(P::key(&value)) {
            Ok(pos) => {
                let Some(found) = self.buckets.get(pos) else {
                    unreachable!()
                };
                (found, Some(value))
            }
            Err(pos) => {
                if self.deleted.test(pos) {
                    // reclaiming a tombstone, so the bucket was already
                    // counted in num_elements
                    self.deleted.clear(pos);
                    debug_assert!(self.num_deleted > 0);
                    self.num_deleted -= 1;
                } else {
                    self.num_elements += 1;
                }
                let displaced = self.buckets.set(pos, value);
                debug_assert!(displaced.is_none());
                let Some(stored) = self.buckets.get(pos) else {
                    unreachable!()
                };
                (stored, None)
            }
        }
    }

    /// Erases the entry stored under `key`, returning `true` if one existed.
    ///
    /// The value is dropped immediately and the bucket becomes a tombstone;
    /// shrinking is evaluated lazily at the next insert.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.len() == 0 {
            return false;
        }
        match self.find_position(key) {
            Ok(pos) => {
                self.buckets.remove(pos);
                self.deleted.set(pos);
                self.num_deleted += 1;
                self.settings.consider_shrink = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Moves all live entries into fresh sparse storage of at least
    /// `min_buckets_wanted` buckets, dropping every tombstone.
    fn rebuild(&mut self, min_buckets_wanted: usize) {
        let new_num_buckets = self.settings.min_buckets(self.len(), min_buckets_wanted);
        let mask = new_num_buckets - 1;
        let mut new_buckets = SparseVec::with_len(new_num_buckets);

        let old_buckets = std::mem::replace(&mut self.buckets, SparseVec::new());
        for value in old_buckets.into_values() {
            // the source has no duplicates, so probing for an empty bucket
            // suffices
            let mut probe = ProbeSeq::new(self.build_hasher.hash_one(P::key(&value)), mask);
            while new_buckets.contains(probe.pos()) {
                probe.advance();
            }
            let displaced = new_buckets.set(probe.pos(), value);
            debug_assert!(displaced.is_none());
        }

        self.num_elements = new_buckets.num_nonempty();
        self.num_deleted = 0;
        self.deleted = DeletedMarks::with_len(new_num_buckets);
        self.buckets = new_buckets;
        self.settings.reset_thresholds(new_num_buckets);
    }

    /// Shrinks if a string of erases left the table sparse enough.
    fn maybe_shrink(&mut self) {
        debug_assert!(self.num_elements >= self.num_deleted);
        if let Some(target) = self.settings.shrink_target(self.len(), self.buckets.len()) {
            self.rebuild(target);
        }
        self.settings.consider_shrink = false;
    }

    /// Makes room for `delta` additional entries, applying any pending shrink
    /// and growing or compacting as needed.
    fn resize_delta(&mut self, delta: usize) {
        if self.settings.consider_shrink {
            self.maybe_shrink();
        }
        let num_buckets = self.buckets.len();
        if num_buckets >= MIN_BUCKETS
            && self.num_elements + delta <= self.settings.enlarge_threshold()
        {
            return;
        }
        if let Some(target) =
            self.settings
                .grow_target(self.num_elements, self.num_deleted, delta, num_buckets)
        {
            self.rebuild(target);
        }
    }

    /// Resets the table to the minimum bucket count, dropping all entries.
    pub fn clear(&mut self) {
        let new_num_buckets = self.settings.min_buckets(0, 0);
        self.buckets = SparseVec::with_len(new_num_buckets);
        self.deleted = DeletedMarks::with_len(new_num_buckets);
        self.num_elements = 0;
        self.num_deleted = 0;
        self.settings.reset_thresholds(new_num_buckets);
    }

    /// Grows the table so at least `target_live` live entries fit without
    /// another resize. `resize(0)` merely applies any pending shrink.
    pub fn resize(&mut self, target_live: usize) {
        if self.settings.consider_shrink || target_live == 0 {
            self.maybe_shrink();
        }
        if target_live > self.num_elements {
            self.resize_delta(target_live - self.num_elements);
        }
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        let num_buckets = self.buckets.len();
        assert!(num_buckets.is_power_of_two() && num_buckets >= MIN_BUCKETS);
        assert!(self.num_deleted <= self.num_elements);
        assert!(self.num_elements <= self.settings.enlarge_threshold());
        assert_eq!(self.buckets.num_nonempty() + self.num_deleted, self.num_elements);
        assert_eq!(self.deleted.count(), self.num_deleted);
        for pos in 0..num_buckets {
            assert!(!(self.buckets.contains(pos) && self.deleted.test(pos)));
        }
        for value in self.buckets.values() {
            assert!(self.find(P::key(value)).is_some());
        }
    }
}

impl<P: KeySpec, S: BuildHasher> Extend<P::Value> for SparseTable<P, S> {
    fn extend<I: IntoIterator<Item = P::Value>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.resize_delta(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<P: KeySpec, S: Clone> Clone for SparseTable<P, S>
where
    P::Value: Clone,
{
    fn clone(&self) -> Self {
        SparseTable {
            settings: self.settings.clone(),
            build_hasher: self.build_hasher.clone(),
            buckets: self.buckets.clone(),
            deleted: self.deleted.clone(),
            num_deleted: self.num_deleted,
            num_elements: self.num_elements,
        }
    }
}

impl<P: KeySpec, S> fmt::Debug for SparseTable<P, S>
where
    P::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Equality compares the sets of live entries; bucket layout and insertion
/// history are ignored.
impl<P: KeySpec, S: BuildHasher> PartialEq for SparseTable<P, S>
where
    P::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|value| other.find(P::key(value)) == Some(value))
    }
}

impl<'a, P: KeySpec, S> IntoIterator for &'a SparseTable<P, S> {
    type Item = &'a P::Value;
    type IntoIter = Values<'a, P::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<P: KeySpec, S: BuildHasher> SparseTable<P, S> {
    /// Writes the table structure to `writer` by delegating to the sparse
    /// vector's metadata after compacting, so the stream never describes
    /// tombstones.
    ///
    /// The layout round-trips through [`read_metadata`][Self::read_metadata]
    /// on a table with the same key spec and hasher; no other compatibility
    /// is promised.
    pub fn write_metadata<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.num_deleted > 0 {
            self.rebuild(crate::settings::DEFAULT_STARTING_BUCKETS);
        }
        self.buckets.write_metadata(writer)
    }

    /// Restores the table structure written by
    /// [`write_metadata`][Self::write_metadata], resetting all counters.
    ///
    /// The stored values are zero-filled until
    /// [`read_nopointer_data`][Self::read_nopointer_data] restores them.
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        P::Value: AnyBitPattern,
    {
        self.buckets.read_metadata(reader)?;
        let num_buckets = self.buckets.len();
        if !num_buckets.is_power_of_two() || num_buckets < MIN_BUCKETS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "bucket count must be a power of two",
            ));
        }
        self.num_elements = self.buckets.num_nonempty();
        self.num_deleted = 0;
        self.deleted = DeletedMarks::with_len(num_buckets);
        self.settings.reset_thresholds(num_buckets);
        Ok(())
    }

    /// Writes the packed bucket values as raw bytes.
    ///
    /// Only valid for value types that contain no pointers; endianness is not
    /// normalized. Call [`write_metadata`][Self::write_metadata] first.
    pub fn write_nopointer_data<W: Write>(&self, writer: &mut W) -> io::Result<()>
    where
        P::Value: NoUninit,
    {
        self.buckets.write_nopointer_data(writer)
    }

    /// Restores the bucket values from the raw bytes written by
    /// [`write_nopointer_data`][Self::write_nopointer_data]. The structure
    /// must already have been restored with
    /// [`read_metadata`][Self::read_metadata].
    pub fn read_nopointer_data<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        P::Value: NoUninit + AnyBitPattern,
    {
        self.buckets.read_nopointer_data(reader)
    }
}
