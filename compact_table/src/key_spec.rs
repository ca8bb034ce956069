//! Key extraction policies relating bucket values to the keys they are
//! indexed under.
use std::{hash::Hash, marker::PhantomData};

/// Describes how the values stored in a table's buckets relate to the keys
/// they are indexed under.
///
/// A table stores whole values; lookups, equality and probing work on the key
/// each value carries. For set-like tables the value *is* the key
/// ([`SelfKey`]); for map-like tables the value is a key/payload pair
/// ([`PairKey`]). Implementations are zero-sized policies used purely at the
/// type level, so they add no per-table storage.
///
/// Key equality is the key type's [`Eq`] and must be consistent with its
/// [`Hash`]: keys that compare equal must hash equally.
pub trait KeySpec {
    /// Value type stored in the table's buckets.
    type Value;
    /// Key type values are indexed under.
    type Key: Hash + Eq;

    /// Borrows the key of a value.
    fn key(value: &Self::Value) -> &Self::Key;

    /// Rewrites the key of a value in place, leaving any payload untouched.
    ///
    /// Tables only call this with reserved sentinel keys, when marking a
    /// bucket as deleted.
    fn write_key(value: &mut Self::Value, key: Self::Key);
}

/// Key spec for set-like tables, where each value is its own key.
pub struct SelfKey<K> {
    _phantom: PhantomData<K>,
}

impl<K: Hash + Eq> KeySpec for SelfKey<K> {
    type Value = K;
    type Key = K;

    #[inline(always)]
    fn key(value: &K) -> &K {
        value
    }

    #[inline(always)]
    fn write_key(value: &mut K, key: K) {
        *value = key;
    }
}

/// Key spec for map-like tables, where each value is a `(key, payload)` pair.
pub struct PairKey<K, V> {
    _phantom: PhantomData<(K, V)>,
}

impl<K: Hash + Eq, V> KeySpec for PairKey<K, V> {
    type Value = (K, V);
    type Key = K;

    #[inline(always)]
    fn key(value: &(K, V)) -> &K {
        &value.0
    }

    #[inline(always)]
    fn write_key(value: &mut (K, V), key: K) {
        value.0 = key;
    }
}
