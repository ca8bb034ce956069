//! Open addressed hash table over a single contiguous bucket array.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    io::{self, Read, Write},
    mem::size_of,
};

use bytemuck::{AnyBitPattern, NoUninit};

use crate::{
    hash::DefaultBuildHasher,
    key_spec::KeySpec,
    settings::{ProbeSeq, Settings, MIN_BUCKETS},
};

/// Hash table engine storing its buckets in a single contiguous array.
///
/// Every bucket always holds a value of the table's value type. Two key
/// values are reserved by the caller to mark the bucket states: a bucket is
/// *empty* when its key equals the key of the *empty value*, and *deleted*
/// when its key equals the *deleted key*. This avoids any per-bucket
/// metadata, at the price of stealing two keys from the key space: neither
/// sentinel key can ever be inserted.
///
/// [`set_empty_value`][Self::set_empty_value] must be called before anything
/// is inserted, and the empty value stays fixed for the lifetime of the
/// table. Without a deleted key the table is insert-only;
/// [`set_deleted_key`][Self::set_deleted_key] enables
/// [`remove`][Self::remove] and can be changed later, which compacts the
/// table first.
///
/// Collisions are resolved by quadratic probing over a power of two bucket
/// count. Erased buckets become tombstones that keep probe chains intact;
/// they are reclaimed by the insert of an equal key, and discarded wholesale
/// whenever the table rebuilds (growing, shrinking, or compacting in place).
///
/// # Examples
///
/// ```
/// use compact_table::{key_spec::SelfKey, DenseTable};
///
/// let mut table: DenseTable<SelfKey<u32>> = DenseTable::new();
/// table.set_empty_value(u32::MAX);
/// table.set_deleted_key(u32::MAX - 1);
///
/// assert!(table.insert(17).1.is_none());
/// assert!(table.insert(17).1.is_some());
/// assert_eq!(table.find(&17), Some(&17));
/// assert!(table.remove(&17));
/// assert_eq!(table.find(&17), None);
/// ```
pub struct DenseTable<P: KeySpec, S = DefaultBuildHasher> {
    settings: Settings,
    build_hasher: S,
    empty_value: Option<P::Value>,
    deleted_key: Option<P::Key>,
    num_deleted: usize,
    /// Occupied plus deleted buckets; the live count is
    /// `num_elements - num_deleted`.
    num_elements: usize,
    /// Tracked separately from the bucket array, which stays unallocated
    /// until the empty value is known.
    num_buckets: usize,
    buckets: Vec<P::Value>,
}

impl<P: KeySpec, S: Default> Default for DenseTable<P, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<P: KeySpec> DenseTable<P> {
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

impl<P: KeySpec, S> DenseTable<P, S> {
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
        DenseTable {
            settings,
            build_hasher,
            empty_value: None,
            deleted_key: None,
            num_deleted: 0,
            num_elements: 0,
            num_buckets,
            buckets: Vec::new(),
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
        self.num_buckets
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

    /// Returns the value whose key marks empty buckets, if it has been set.
    pub fn empty_value(&self) -> Option<&P::Value> {
        self.empty_value.as_ref()
    }

    /// Returns the key marking deleted buckets, if one is set.
    pub fn deleted_key(&self) -> Option<&P::Key> {
        self.deleted_key.as_ref()
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
        self.settings.set_fractions(shrink, grow, self.num_buckets);
    }

    /// Returns an iterator over the live entries, in unspecified order.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            slots: self.buckets.iter(),
            empty_key: self.empty_value.as_ref().map(P::key),
            deleted_key: if self.num_deleted > 0 {
                self.deleted_key.as_ref()
            } else {
                None
            },
        }
    }

    /// Returns an iterator yielding mutable references to the live entries.
    ///
    /// Values may be mutated, but a value's key must stay equal to itself or
    /// the table becomes inconsistent.
    pub fn iter_mut(&mut self) -> IterMut<'_, P> {
        IterMut {
            empty_key: self.empty_value.as_ref().map(P::key),
            deleted_key: if self.num_deleted > 0 {
                self.deleted_key.as_ref()
            } else {
                None
            },
            slots: self.buckets.iter_mut(),
        }
    }

    fn is_empty_key(&self, key: &P::Key) -> bool {
        match &self.empty_value {
            Some(empty) => P::key(empty) == key,
            None => false,
        }
    }

    /// The `num_deleted` guard matters after a raw data read: the buckets may
    /// transiently hold the deleted key without any erase having happened,
    /// and that must not read back as a tombstone.
    fn is_deleted_key(&self, key: &P::Key) -> bool {
        self.num_deleted > 0 && self.deleted_key.as_ref() == Some(key)
    }
}

impl<P: KeySpec, S: BuildHasher> DenseTable<P, S> {
    /// Walks the probe sequence for `key`. Returns `Ok` with the bucket
    /// holding the key, or `Err` with the bucket an insert of it should use:
    /// the first tombstone seen, if any, so inserts reclaim deleted buckets.
    fn find_position<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        debug_assert_eq!(self.buckets.len(), self.num_buckets);
        let mask = self.num_buckets - 1;
        let mut probe = ProbeSeq::new(self.build_hasher.hash_one(key), mask);
        let mut insert_pos = None;
        let mut num_probes = 0;
        loop {
            let bucket_key = P::key(&self.buckets[probe.pos()]);
            if self.is_empty_key(bucket_key) {
                return Err(insert_pos.unwrap_or(probe.pos()));
            } else if self.is_deleted_key(bucket_key) {
                if insert_pos.is_none() {
                    insert_pos = Some(probe.pos());
                }
            } else if bucket_key.borrow() == key {
                return Ok(probe.pos());
            }
            num_probes += 1;
            debug_assert!(
                num_probes < self.num_buckets,
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
            Ok(pos) => Some(&self.buckets[pos]),
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
            Ok(pos) => Some(&mut self.buckets[pos]),
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

    #[cfg(test)]
    pub(crate) fn check(&self) {
        assert!(self.num_buckets.is_power_of_two() && self.num_buckets >= MIN_BUCKETS);
        assert!(self.num_deleted <= self.num_elements);
        if self.buckets.is_empty() {
            assert_eq!(self.num_elements, 0);
            return;
        }
        assert_eq!(self.buckets.len(), self.num_buckets);
        assert!(self.num_elements <= self.settings.enlarge_threshold());
        let mut occupied = 0;
        let mut deleted = 0;
        for value in &self.buckets {
            let key = P::key(value);
            if self.is_empty_key(key) {
                continue;
            }
            if self.is_deleted_key(key) {
                deleted += 1;
            } else {
                occupied += 1;
                assert!(self.find(key).is_some());
            }
        }
        assert_eq!(deleted, self.num_deleted);
        assert_eq!(occupied + deleted, self.num_elements);
    }
}

impl<P: KeySpec, S: BuildHasher> DenseTable<P, S>
where
    P::Value: Clone,
    P::Key: Clone,
{
    /// Sets the value whose key marks empty buckets and allocates the bucket
    /// array filled with it.
    ///
    /// Must be called exactly once, before the first insert. Only the key of
    /// `value` matters; for map-like tables the payload is arbitrary.
    ///
    /// Panics if the empty value was already set, or if its key equals the
    /// deleted key.
    pub fn set_empty_value(&mut self, value: P::Value) {
        assert!(
            self.empty_value.is_none(),
            "the empty value can only be set once"
        );
        if let Some(deleted) = &self.deleted_key {
            assert!(
                P::key(&value) != deleted,
                "the empty and deleted keys must differ"
            );
        }
        debug_assert!(self.buckets.is_empty());
        self.buckets = vec![value.clone(); self.num_buckets];
        self.empty_value = Some(value);
    }

    /// Sets the key marking deleted buckets, enabling
    /// [`remove`][Self::remove].
    ///
    /// The key must never be inserted as real data. Changing the deleted key
    /// first compacts the table so no bucket still carries the old one.
    ///
    /// Panics if `key` equals the empty value's key.
    pub fn set_deleted_key(&mut self, key: P::Key) {
        if let Some(empty) = &self.empty_value {
            assert!(
                P::key(empty) != &key,
                "the empty and deleted keys must differ"
            );
        }
        self.squash_deleted();
        self.deleted_key = Some(key);
    }

    /// Removes the deleted key, making the table insert-only; compacts first.
    pub fn clear_deleted_key(&mut self) {
        self.squash_deleted();
        self.deleted_key = None;
    }

    /// Rebuilds in place to get rid of all deleted buckets.
    fn squash_deleted(&mut self) {
        if self.num_deleted > 0 {
            self.rebuild(crate::settings::DEFAULT_STARTING_BUCKETS);
        }
        debug_assert_eq!(self.num_deleted, 0);
    }

    /// Moves all live entries into a fresh bucket array of at least
    /// `min_buckets_wanted` buckets, dropping every tombstone.
    fn rebuild(&mut self, min_buckets_wanted: usize) {
        let empty = self
            .empty_value
            .clone()
            .expect("the empty value must be set before the table is used");
        let new_num_buckets = self.settings.min_buckets(self.len(), min_buckets_wanted);
        let mask = new_num_buckets - 1;
        let mut new_buckets = vec![empty; new_num_buckets];
        let mut num_live = 0;

        let old_buckets = std::mem::take(&mut self.buckets);
        for value in old_buckets {
            let key = P::key(&value);
            if self.is_empty_key(key) || self.is_deleted_key(key) {
                continue;
            }
            // the source has no duplicates, so probing for an empty bucket
            // suffices
            let mut probe = ProbeSeq::new(self.build_hasher.hash_one(key), mask);
            while !self.is_empty_key(P::key(&new_buckets[probe.pos()])) {
                probe.advance();
            }
            new_buckets[probe.pos()] = value;
            num_live += 1;
        }

        self.buckets = new_buckets;
        self.num_buckets = new_num_buckets;
        self.num_elements = num_live;
        self.num_deleted = 0;
        self.settings.reset_thresholds(new_num_buckets);
    }

    /// Shrinks if a string of erases left the table sparse enough.
    fn maybe_shrink(&mut self) {
        debug_assert!(self.num_elements >= self.num_deleted);
        if let Some(target) = self.settings.shrink_target(self.len(), self.num_buckets) {
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
        if self.num_buckets >= MIN_BUCKETS
            && self.num_elements + delta <= self.settings.enlarge_threshold()
        {
            return;
        }
        if let Some(target) =
            self.settings
                .grow_target(self.num_elements, self.num_deleted, delta, self.num_buckets)
        {
            self.rebuild(target);
        }
    }

    /// Inserts `value` unless a value with an equal key is already present.
    ///
    /// Returns a reference to the value stored under the key, together with
    /// the passed value if an equal key was already present (in which case
    /// the table is unchanged).
    ///
    /// Panics if the empty value is not set, or if the key of `value` is one
    /// of the reserved sentinel keys.
    pub fn insert(&mut self, value: P::Value) -> (&P::Value, Option<P::Value>) {
        self.resize_delta(1);
        self.insert_noresize(value)
    }

    fn insert_noresize(&mut self, value: P::Value) -> (&P::Value, Option<P::Value>) {
        assert!(
            self.empty_value.is_some(),
            "the empty value must be set before inserting"
        );
        let key = P::key(&value);
        assert!(!self.is_empty_key(key), "cannot insert the empty sentinel");
        assert!(
            self.deleted_key.as_ref() != Some(key),
            "cannot insert the deleted sentinel"
        );
        match self.find_position(key) {
            Ok(pos) => (&self.buckets[pos], Some(value)),
            Err(pos) => {
                if self.is_deleted_key(P::key(&self.buckets[pos])) {
                    // reclaiming a tombstone, so the bucket was already
                    // counted in num_elements
                    debug_assert!(self.num_deleted > 0);
                    self.num_deleted -= 1;
                } else {
                    self.num_elements += 1;
                }
                self.buckets[pos] = value;
                (&self.buckets[pos], None)
            }
        }
    }

    /// Erases the entry stored under `key`, returning `true` if one existed.
    ///
    /// The bucket becomes a tombstone; shrinking is evaluated lazily at the
    /// next insert. Requires a deleted key when an entry is actually erased.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(empty) = &self.empty_value {
            assert!(
                P::key(empty).borrow() != key,
                "cannot remove the empty sentinel"
            );
        }
        if let Some(deleted) = &self.deleted_key {
            assert!(deleted.borrow() != key, "cannot remove the deleted sentinel");
        }
        if self.len() == 0 {
            return false;
        }
        match self.find_position(key) {
            Ok(pos) => {
                let deleted = self
                    .deleted_key
                    .clone()
                    .expect("a deleted key must be set before removing");
                P::write_key(&mut self.buckets[pos], deleted);
                self.num_deleted += 1;
                self.settings.consider_shrink = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Resets the table to the minimum bucket count, dropping all entries.
    pub fn clear(&mut self) {
        let new_num_buckets = self.settings.min_buckets(0, 0);
        if self.num_elements == 0 && self.num_deleted == 0 && new_num_buckets == self.num_buckets {
            return;
        }
        if let Some(empty) = self.empty_value.clone() {
            self.buckets.clear();
            self.buckets.resize(new_num_buckets, empty);
        }
        self.num_buckets = new_num_buckets;
        self.num_elements = 0;
        self.num_deleted = 0;
        self.settings.reset_thresholds(new_num_buckets);
    }

    /// Drops all entries while keeping the bucket count unchanged.
    pub fn clear_no_resize(&mut self) {
        if let Some(empty) = self.empty_value.clone() {
            self.buckets.fill(empty);
        }
        self.num_elements = 0;
        self.num_deleted = 0;
        self.settings.reset_thresholds(self.num_buckets);
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
}

impl<P: KeySpec, S: BuildHasher> Extend<P::Value> for DenseTable<P, S>
where
    P::Value: Clone,
    P::Key: Clone,
{
    fn extend<I: IntoIterator<Item = P::Value>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.resize_delta(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<P: KeySpec, S: Clone> Clone for DenseTable<P, S>
where
    P::Value: Clone,
    P::Key: Clone,
{
    fn clone(&self) -> Self {
        DenseTable {
            settings: self.settings.clone(),
            build_hasher: self.build_hasher.clone(),
            empty_value: self.empty_value.clone(),
            deleted_key: self.deleted_key.clone(),
            num_deleted: self.num_deleted,
            num_elements: self.num_elements,
            num_buckets: self.num_buckets,
            buckets: self.buckets.clone(),
        }
    }
}

impl<P: KeySpec, S> fmt::Debug for DenseTable<P, S>
where
    P::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Equality compares the sets of live entries; bucket layout, sentinels and
/// insertion history are ignored.
impl<P: KeySpec, S: BuildHasher> PartialEq for DenseTable<P, S>
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

impl<'a, P: KeySpec, S> IntoIterator for &'a DenseTable<P, S> {
    type Item = &'a P::Value;
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<P: KeySpec, S: BuildHasher> DenseTable<P, S>
where
    P::Value: Clone,
    P::Key: Clone,
{
    /// Writes the table shape to `writer`: bucket and element counts, native
    /// endian. Compacts first so the stream never describes tombstones.
    ///
    /// The layout round-trips through [`read_metadata`][Self::read_metadata]
    /// on a table with the same key spec, hasher and empty value; no other
    /// compatibility is promised.
    pub fn write_metadata<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.squash_deleted();
        writer.write_all(&(self.num_buckets as u64).to_ne_bytes())?;
        writer.write_all(&(self.num_elements as u64).to_ne_bytes())
    }

    /// Restores the table shape written by
    /// [`write_metadata`][Self::write_metadata], resizing the bucket array
    /// and resetting all counters. The empty value must already be set.
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        let empty = self
            .empty_value
            .clone()
            .expect("the empty value must be set before reading");
        let num_buckets = read_u64(reader)? as usize;
        let num_elements = read_u64(reader)? as usize;
        if !num_buckets.is_power_of_two() || num_buckets < MIN_BUCKETS {
            return Err(invalid_data("bucket count must be a power of two"));
        }
        if num_elements > num_buckets {
            return Err(invalid_data("more elements than buckets"));
        }
        self.buckets.clear();
        self.buckets.resize(num_buckets, empty);
        self.num_buckets = num_buckets;
        self.num_elements = num_elements;
        self.num_deleted = 0;
        self.settings.reset_thresholds(num_buckets);
        Ok(())
    }
}

impl<P: KeySpec, S> DenseTable<P, S>
where
    P::Value: NoUninit,
{
    /// Writes every bucket verbatim as raw bytes, empty buckets included.
    ///
    /// Only valid for value types that contain no pointers; endianness is not
    /// normalized. Call [`write_metadata`][Self::write_metadata] first.
    pub fn write_nopointer_data<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(bytemuck::cast_slice(&self.buckets))
    }
}

impl<P: KeySpec, S> DenseTable<P, S>
where
    P::Value: NoUninit + AnyBitPattern,
{
    /// Restores the bucket array from the raw bytes written by
    /// [`write_nopointer_data`][Self::write_nopointer_data]. The shape must
    /// already have been restored with
    /// [`read_metadata`][Self::read_metadata].
    pub fn read_nopointer_data<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        reader.read_exact(bytemuck::cast_slice_mut(&mut self.buckets))
    }
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn read_u64(reader: &mut impl Read) -> io::Result<u64> {
    let mut bytes = [0; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_ne_bytes(bytes))
}

/// Iterator over a dense table's live entries, skipping empty and deleted
/// buckets.
pub struct Iter<'a, P: KeySpec> {
    slots: std::slice::Iter<'a, P::Value>,
    empty_key: Option<&'a P::Key>,
    deleted_key: Option<&'a P::Key>,
}

impl<'a, P: KeySpec> Iterator for Iter<'a, P> {
    type Item = &'a P::Value;

    fn next(&mut self) -> Option<Self::Item> {
        for value in self.slots.by_ref() {
            let key = Some(P::key(value));
            if key == self.empty_key || key == self.deleted_key {
                continue;
            }
            return Some(value);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

/// Iterator yielding mutable references to a dense table's live entries.
pub struct IterMut<'a, P: KeySpec> {
    slots: std::slice::IterMut<'a, P::Value>,
    empty_key: Option<&'a P::Key>,
    deleted_key: Option<&'a P::Key>,
}

impl<'a, P: KeySpec> Iterator for IterMut<'a, P> {
    type Item = &'a mut P::Value;

    fn next(&mut self) -> Option<Self::Item> {
        for value in self.slots.by_ref() {
            let key = Some(P::key(value));
            if key == self.empty_key || key == self.deleted_key {
                continue;
            }
            return Some(value);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}
