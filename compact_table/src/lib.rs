//! Memory efficient open addressed hash tables.
//!
//! This crate provides two hash table engines that share one design — power
//! of two bucket counts, quadratic probing, growth ahead of a configurable
//! occupancy threshold and lazy shrinking after erases — but make opposite
//! storage trade-offs:
//!
//! * [`DenseTable`] keeps every bucket in one contiguous array and marks
//!   empty and deleted buckets with caller-reserved sentinel keys, spending
//!   memory on empty buckets to get the fastest possible probing.
//! * [`SparseTable`] keeps its buckets in a [`sparse_vec::SparseVec`], where
//!   an empty bucket costs only a presence bit, and tracks deleted buckets in
//!   a parallel bitmap. It needs no reserved keys and supports a compact
//!   persistent form.
//!
//! Both engines store whole values and derive the indexed key from each value
//! through a [`KeySpec`][key_spec::KeySpec] policy. The façades
//! [`DenseSet`]/[`SparseSet`] (the value is the key) and
//! [`DenseMap`]/[`SparseMap`] (the value is a key/payload pair) cover the
//! common cases.
//!
//! Inserting keeps at most one entry per key: inserting an equal key a second
//! time leaves the table unchanged and hands the value back. Iteration order
//! is a function of the bucket count and insertion history and is not
//! preserved across resizes. Tables are single-threaded; share them across
//! threads with external synchronization only.
//!
//! ```
//! use compact_table::SparseMap;
//!
//! let mut counts: SparseMap<String, u64> = SparseMap::new();
//! for word in ["the", "cat", "sat", "on", "the", "mat"] {
//!     if let Some(count) = counts.get_mut(word) {
//!         *count += 1;
//!         continue;
//!     }
//!     counts.insert(word.to_string(), 1);
//! }
//! assert_eq!(counts.get("the"), Some(&2));
//! assert_eq!(counts.len(), 5);
//! ```
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

pub mod dense_map;
pub mod dense_set;
pub mod dense_table;
pub mod hash;
pub mod key_spec;
pub mod sparse_map;
pub mod sparse_set;
pub mod sparse_table;

mod settings;

mod test_dense;
mod test_sparse;

pub use dense_map::DenseMap;
pub use dense_set::DenseSet;
pub use dense_table::DenseTable;
pub use hash::DefaultBuildHasher;
pub use sparse_map::SparseMap;
pub use sparse_set::SparseSet;
pub use sparse_table::SparseTable;
