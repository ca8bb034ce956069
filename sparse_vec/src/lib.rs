//! Sparse vectors that store present values in bitmap indexed groups.
//!
//! This crate provides the [`SparseVec`] type, a fixed-length sequence of
//! logical slots in which most slots are expected to be empty. Instead of
//! reserving storage for every slot, a sparse vector partitions its slots into
//! groups of [`GROUP_SIZE`] consecutive slots. Each group keeps a presence
//! bitmap with one bit per slot and a packed array holding only the present
//! values, in ascending slot order. Locating a value within a group is a
//! population count over the bits below its slot, so random access stays O(1)
//! while an empty slot costs only its presence bit plus a small per-group
//! share of the packed array header.
//!
//! ## Iteration
//!
//! Two iteration flavors are provided:
//!
//! * [`iter`][SparseVec::iter] visits every logical slot in order and yields
//!   `Option<&T>`, exposing whether the slot is present. The iterator is
//!   cheaply skippable (`nth` is O(1)), which makes it suitable for indexed
//!   algorithms.
//! * [`values`][SparseVec::values] visits only the present slots in ascending
//!   slot order by walking the packed arrays directly, with O(1) amortized
//!   steps. It does not support O(1) skipping.
//!
//! ## Serialization
//!
//! A sparse vector can be written to and read back from a byte stream in two
//! parts: [`write_metadata`][SparseVec::write_metadata] records the slot
//! structure (length, occupancy, per-group bitmaps and counts) in a way that
//! can be decoded without knowing anything about the value type, while
//! [`write_nopointer_data`][SparseVec::write_nopointer_data] appends the
//! packed values as raw bytes. The data half is restricted to value types
//! without pointers, witnessed by [`bytemuck`] marker traits, and performs no
//! endian normalization; readers must share the writer's native layout.
//!
//! ## Example
//!
//! ```
//! use sparse_vec::SparseVec;
//!
//! let mut vec: SparseVec<u32> = SparseVec::with_len(70);
//! vec.set(12, 144);
//! vec.set(47, 2209);
//! vec.set(48, 2304);
//!
//! assert_eq!(vec.len(), 70);
//! assert_eq!(vec.num_nonempty(), 3);
//! assert_eq!(vec.get(12), Some(&144));
//! assert_eq!(vec.get(13), None);
//!
//! // Truncating to 48 slots drops the value stored at slot 48.
//! vec.resize(48);
//! assert_eq!(vec.num_nonempty(), 2);
//! assert_eq!(vec.values().copied().collect::<Vec<_>>(), [144, 2209]);
//! ```
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

mod group;
mod iter;
mod sparse_vec;

mod test_sparse_vec;

pub use group::GROUP_SIZE;
pub use iter::{IntoValues, Slots, Values, ValuesMut};
pub use sparse_vec::SparseVec;
