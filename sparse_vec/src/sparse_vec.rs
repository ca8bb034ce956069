//! [`SparseVec`] itself, including its persistent form.
use std::{
    fmt,
    io::{self, Read, Write},
};

use bytemuck::{AnyBitPattern, NoUninit};

use crate::{
    group::{SparseGroup, GROUP_SIZE},
    iter::{IntoValues, Slots, Values, ValuesMut},
};

/// Fixed-length sequence of logical slots storing only the present values.
///
/// The slots are partitioned into groups of [`GROUP_SIZE`](crate::GROUP_SIZE)
/// consecutive slots, each keeping a presence bitmap and a packed array of the
/// present values. See the [crate docs](crate) for an overview.
pub struct SparseVec<T> {
    groups: Vec<SparseGroup<T>>,
    len: usize,
    num_nonempty: usize,
}

impl<T> Default for SparseVec<T> {
    fn default() -> Self {
        SparseVec {
            groups: Vec::new(),
            len: 0,
            num_nonempty: 0,
        }
    }
}

impl<T: Clone> Clone for SparseVec<T> {
    fn clone(&self) -> Self {
        SparseVec {
            groups: self.groups.clone(),
            len: self.len,
            num_nonempty: self.num_nonempty,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .enumerate()
                    .filter_map(|(index, slot)| Some((index, slot?))),
            )
            .finish()
    }
}

impl<T: PartialEq> PartialEq for SparseVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T> SparseVec<T> {
    /// Returns an empty sparse vector with no slots.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns a sparse vector with `len` empty slots.
    pub fn with_len(len: usize) -> Self {
        SparseVec {
            groups: std::iter::repeat_with(Default::default)
                .take(len.div_ceil(GROUP_SIZE))
                .collect(),
            len,
            num_nonempty: 0,
        }
    }

    /// Returns the number of logical slots, empty slots included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the vector has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of present slots.
    pub fn num_nonempty(&self) -> usize {
        self.num_nonempty
    }

    /// Returns `true` if the slot at `index` is present.
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        assert!(index < self.len, "slot index out of bounds");
        self.groups[index / GROUP_SIZE].contains(index % GROUP_SIZE)
    }

    /// Returns a reference to the value at `index` if the slot is present.
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        assert!(index < self.len, "slot index out of bounds");
        self.groups[index / GROUP_SIZE].get(index % GROUP_SIZE)
    }

    /// Returns a mutable reference to the value at `index` if the slot is
    /// present.
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        assert!(index < self.len, "slot index out of bounds");
        self.groups[index / GROUP_SIZE].get_mut(index % GROUP_SIZE)
    }

    /// Stores `value` in the slot at `index`, returning the displaced value if
    /// the slot was already present.
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: T) -> Option<T> {
        assert!(index < self.len, "slot index out of bounds");
        let displaced = self.groups[index / GROUP_SIZE].set(index % GROUP_SIZE, value);
        if displaced.is_none() {
            self.num_nonempty += 1;
        }
        displaced
    }

    /// Empties the slot at `index`, returning the value it held.
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        assert!(index < self.len, "slot index out of bounds");
        let removed = self.groups[index / GROUP_SIZE].remove(index % GROUP_SIZE);
        if removed.is_some() {
            self.num_nonempty -= 1;
        }
        removed
    }

    /// Empties every slot while keeping the slot count unchanged.
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
        self.num_nonempty = 0;
    }

    /// Changes the number of logical slots to `new_len`.
    ///
    /// Growing appends empty slots at the end. Shrinking discards the trailing
    /// slots, dropping any values they held.
    pub fn resize(&mut self, new_len: usize) {
        let new_groups = new_len.div_ceil(GROUP_SIZE);
        if new_len < self.len {
            for group in self.groups.drain(new_groups..) {
                self.num_nonempty -= group.len();
            }
            if let Some(boundary) = self.groups.last_mut() {
                let keep_slots = new_len - (new_groups - 1) * GROUP_SIZE;
                if keep_slots < GROUP_SIZE {
                    self.num_nonempty -= boundary.truncate(keep_slots);
                }
            }
        }
        self.groups.resize_with(new_groups, Default::default);
        self.len = new_len;
    }

    /// Returns an iterator over every logical slot, yielding `Some` for
    /// present slots and `None` for empty ones.
    pub fn iter(&self) -> Slots<'_, T> {
        Slots::new(self)
    }

    /// Returns an iterator over the present values in ascending slot order.
    pub fn values(&self) -> Values<'_, T> {
        Values::new(&self.groups, self.num_nonempty)
    }

    /// Returns an iterator yielding mutable references to the present values
    /// in ascending slot order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, T> {
        ValuesMut::new(&mut self.groups, self.num_nonempty)
    }

    /// Consumes the vector and returns an iterator over the present values in
    /// ascending slot order.
    pub fn into_values(self) -> IntoValues<T> {
        IntoValues::new(self.groups, self.num_nonempty)
    }

    #[cfg(test)]
    pub(crate) fn check(&self) {
        assert_eq!(self.groups.len(), self.len.div_ceil(GROUP_SIZE));
        let mut present = 0;
        for group in &self.groups {
            group.check();
            present += group.len();
        }
        assert_eq!(present, self.num_nonempty);
        if self.len % GROUP_SIZE != 0 {
            let boundary = self.groups.last().expect("at least one group");
            assert_eq!(boundary.bitmap() >> (self.len % GROUP_SIZE), 0);
        }
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

fn read_u16(reader: &mut impl Read) -> io::Result<u16> {
    let mut bytes = [0; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_ne_bytes(bytes))
}

impl<T> SparseVec<T> {
    /// Writes the slot structure to `writer`: the slot count, the number of
    /// present slots and each group's count and presence bitmap.
    ///
    /// The metadata can be decoded without knowing the value type. The stored
    /// values themselves are written separately by
    /// [`write_nopointer_data`][Self::write_nopointer_data]. No endian
    /// normalization is performed.
    pub fn write_metadata<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.len as u64).to_ne_bytes())?;
        writer.write_all(&(self.num_nonempty as u64).to_ne_bytes())?;
        for group in &self.groups {
            writer.write_all(&(group.len() as u16).to_ne_bytes())?;
            writer.write_all(&group.bitmap().to_ne_bytes())?;
        }
        Ok(())
    }

    /// Reads back the slot structure written by
    /// [`write_metadata`][Self::write_metadata], replacing the current
    /// contents.
    ///
    /// All present slots are zero-filled until
    /// [`read_nopointer_data`][Self::read_nopointer_data] restores their
    /// values.
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        T: AnyBitPattern,
    {
        let len = usize::try_from(read_u64(reader)?)
            .map_err(|_| invalid_data("slot count out of range"))?;
        let num_nonempty = usize::try_from(read_u64(reader)?)
            .map_err(|_| invalid_data("occupancy out of range"))?;

        let num_groups = len.div_ceil(GROUP_SIZE);
        let mut groups = Vec::with_capacity(num_groups);
        let mut present = 0;
        for group_index in 0..num_groups {
            let count = read_u16(reader)? as usize;
            let bitmap = read_u64(reader)?;
            if bitmap.count_ones() as usize != count {
                return Err(invalid_data("group count does not match its bitmap"));
            }
            let group_slots = (len - group_index * GROUP_SIZE).min(GROUP_SIZE);
            if bitmap >> group_slots != 0 {
                return Err(invalid_data("bitmap marks slots past the end"));
            }
            present += count;
            groups.push(SparseGroup::from_parts(bitmap, vec![T::zeroed(); count]));
        }
        if present != num_nonempty {
            return Err(invalid_data("group counts do not sum to the occupancy"));
        }

        self.groups = groups;
        self.len = len;
        self.num_nonempty = num_nonempty;
        Ok(())
    }

    /// Writes the packed arrays of present values to `writer` as raw bytes.
    ///
    /// Only valid for value types that contain no pointers, witnessed by
    /// [`NoUninit`]. Endianness is not normalized, so the bytes are only
    /// meaningful to a reader with the writer's native layout.
    pub fn write_nopointer_data<W: Write>(&self, writer: &mut W) -> io::Result<()>
    where
        T: NoUninit,
    {
        for group in &self.groups {
            writer.write_all(bytemuck::cast_slice(group.values()))?;
        }
        Ok(())
    }

    /// Restores the packed value arrays from the raw bytes written by
    /// [`write_nopointer_data`][Self::write_nopointer_data].
    ///
    /// The slot structure must already have been restored with
    /// [`read_metadata`][Self::read_metadata].
    pub fn read_nopointer_data<R: Read>(&mut self, reader: &mut R) -> io::Result<()>
    where
        T: NoUninit + AnyBitPattern,
    {
        for group in &mut self.groups {
            reader.read_exact(bytemuck::cast_slice_mut(group.values_mut()))?;
        }
        Ok(())
    }
}
