#![cfg(test)]
#![allow(missing_docs)]
use crate::{key_spec::KeySpec, SparseMap, SparseSet, SparseTable};
use rand::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;

#[test]
fn basic_set_ops() {
    let mut set: SparseSet<u64> = SparseSet::new();
    // no sentinel configuration needed, the whole key space is usable
    assert!(set.insert(0));
    assert!(set.insert(u64::MAX));
    assert!(set.insert(42));
    assert!(!set.insert(42));
    assert_eq!(set.len(), 3);
    assert!(set.contains(&0));
    assert_eq!(set.get(&42), Some(&42));

    assert!(set.remove(&42));
    assert!(!set.remove(&42));
    assert_eq!(set.len(), 2);
    assert_eq!(set.get(&42), None);
    assert!(set.insert(42));
    assert_eq!(set.len(), 3);
    set.check();
}

#[test]
fn sparse_map_basic() {
    let mut map: SparseMap<String, usize> = SparseMap::new();
    assert_eq!(map.insert("adam".to_string(), 10), None);
    assert_eq!(map.insert("eve".to_string(), 23), None);
    assert_eq!(map.insert("jim".to_string(), 5), None);
    assert_eq!(
        map.insert("eve".to_string(), 99),
        Some(("eve".to_string(), 99))
    );

    assert_eq!(map.get("adam"), Some(&10));
    assert_eq!(map.get_key_value("jim"), Some((&"jim".to_string(), &5)));
    *map.get_mut("adam").unwrap() += 1;
    assert_eq!(map.get("adam"), Some(&11));

    assert!(map.remove("jim"));
    assert!(!map.contains_key("jim"));
    assert_eq!(map.len(), 2);

    let mut entries: Vec<(&str, usize)> = map
        .iter()
        .map(|(key, &value)| (key.as_str(), value))
        .collect();
    entries.sort_unstable();
    assert_eq!(entries, [("adam", 11), ("eve", 23)]);

    for value in map.values_mut() {
        *value *= 2;
    }
    assert_eq!(map.get("eve"), Some(&46));
    map.check();
}

#[test]
fn from_iterator_and_equality() {
    let forward: SparseSet<u32> = (0..200).collect();
    let backward: SparseSet<u32> = (0..200).rev().collect();
    assert_eq!(forward.len(), 200);
    assert_eq!(forward, backward);

    let smaller: SparseSet<u32> = (0..199).collect();
    assert_ne!(forward, smaller);

    let cloned = forward.clone();
    assert_eq!(cloned, forward);
    cloned.check();

    let map: SparseMap<u32, u32> = (0..50).map(|key| (key, key + 1)).collect();
    assert_eq!(map.len(), 50);
    assert_eq!(map.get(&7), Some(&8));
}

#[test]
fn lazy_shrink_on_insert() {
    let mut set: SparseSet<u64> = SparseSet::new();
    for key in 0..1000 {
        set.insert(key);
    }
    assert_eq!(set.bucket_count(), 2048);

    for key in 0..990 {
        set.remove(&key);
    }
    // shrinking is lazy, the erases alone change nothing
    assert_eq!(set.bucket_count(), 2048);

    set.insert(5000);
    assert_eq!(set.bucket_count(), 32);
    assert_eq!(set.len(), 11);
    for key in 990..1000 {
        assert!(set.contains(&key));
    }
    assert!(set.contains(&5000));
    set.check();
}

#[test]
fn zero_shrink_fraction_disables_shrinking() {
    let mut set: SparseSet<u64> = SparseSet::new();
    set.set_resizing_parameters(0.0, 0.5);
    for key in 0..1000 {
        set.insert(key);
    }
    for key in 0..1000 {
        set.remove(&key);
    }
    set.resize(0);
    assert_eq!(set.bucket_count(), 2048);
    set.check();
}

#[test]
fn tombstone_reclaimed_on_reinsert() {
    let mut table: SparseTable<crate::key_spec::SelfKey<u32>> = SparseTable::new();
    assert!(table.insert(7).1.is_none());
    assert_eq!(table.nonempty_bucket_count(), 1);

    assert!(table.remove(&7));
    assert_eq!(table.len(), 0);
    assert_eq!(table.find(&7), None);
    // the tombstone still counts as a nonempty bucket
    assert_eq!(table.nonempty_bucket_count(), 1);

    let (stored, rejected) = table.insert(7);
    assert_eq!(*stored, 7);
    assert!(rejected.is_none());
    assert_eq!(table.len(), 1);
    assert_eq!(table.nonempty_bucket_count(), 1);
    table.check();
}

/// Pointer-free record indexed by its fixed-width word, for the persistence
/// tests below.
#[derive(Clone, Copy, PartialEq, Debug)]
#[repr(C)]
struct WordCount {
    word: [u8; 8],
    count: u64,
}

// SAFETY: repr(C) with 8 + 8 byte fields, so no padding, no uninit bytes and
// no pointers; any bit pattern is a valid value
unsafe impl bytemuck::Zeroable for WordCount {}
// SAFETY: as above
unsafe impl bytemuck::NoUninit for WordCount {}
// SAFETY: as above
unsafe impl bytemuck::AnyBitPattern for WordCount {}

struct ByWord;

impl KeySpec for ByWord {
    type Value = WordCount;
    type Key = [u8; 8];

    fn key(value: &WordCount) -> &[u8; 8] {
        &value.word
    }

    fn write_key(value: &mut WordCount, key: [u8; 8]) {
        value.word = key;
    }
}

fn pad(word: &str) -> [u8; 8] {
    let mut bytes = [0; 8];
    bytes[..word.len()].copy_from_slice(word.as_bytes());
    bytes
}

#[test]
fn word_index_round_trip() {
    let words = [
        "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "and", "cat",
    ];
    let mut index: SparseTable<ByWord> = SparseTable::new();
    for (position, word) in words.iter().enumerate() {
        let rejected = index
            .insert(WordCount {
                word: pad(word),
                count: position as u64,
            })
            .1;
        assert!(rejected.is_none());
    }
    // leave a tombstone behind so the write path has to compact
    assert!(index.remove(&pad("lazy")));

    let mut stream = Vec::new();
    index.write_metadata(&mut stream).unwrap();
    index.write_nopointer_data(&mut stream).unwrap();

    let mut restored: SparseTable<ByWord> = SparseTable::new();
    let mut cursor = Cursor::new(stream);
    restored.read_metadata(&mut cursor).unwrap();
    restored.read_nopointer_data(&mut cursor).unwrap();
    restored.check();

    assert_eq!(restored, index);
    for word in words {
        if word == "lazy" {
            assert!(restored.find(&pad(word)).is_none());
        } else {
            let found = restored.find(&pad(word)).unwrap();
            assert_eq!(found.word, pad(word));
        }
    }
    assert!(restored.find(&pad("missing")).is_none());
}

#[test]
fn sparse_set_round_trip() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(4);
    let mut set: SparseSet<u64> = SparseSet::new();
    for _ in 0..500 {
        set.insert(rng.gen_range(0..100_000));
    }
    for _ in 0..100 {
        set.remove(&rng.gen_range(0..100_000));
    }

    let mut stream = Vec::new();
    set.write_metadata(&mut stream).unwrap();
    set.write_nopointer_data(&mut stream).unwrap();

    let mut restored: SparseSet<u64> = SparseSet::new();
    let mut cursor = Cursor::new(stream);
    restored.read_metadata(&mut cursor).unwrap();
    restored.read_nopointer_data(&mut cursor).unwrap();
    restored.check();

    assert_eq!(restored, set);
    assert_eq!(restored.len(), set.len());
    for &key in &set {
        assert!(restored.contains(&key));
    }
}

#[test]
fn randomized_against_reference() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(27);
    let mut dut: SparseSet<i64> = SparseSet::with_capacity(4);
    let mut reference: HashSet<i64> = HashSet::new();

    for step in 0..4000 {
        match rng.gen_range(0..12) {
            0..=5 => {
                let key = rng.gen_range(0..400);
                assert_eq!(dut.insert(key), reference.insert(key));
            }
            6..=8 => {
                let key = rng.gen_range(0..400);
                assert_eq!(dut.remove(&key), reference.remove(&key));
            }
            9..=10 => {
                let key = rng.gen_range(0..400);
                assert_eq!(dut.contains(&key), reference.contains(&key));
            }
            _ => match rng.gen_range(0..3) {
                0 => dut.resize(0),
                1 => dut.resize(reference.len() + 10),
                _ => {
                    dut.clear();
                    reference.clear();
                }
            },
        }
        if step % 128 == 0 {
            dut.check();
            assert_eq!(dut.len(), reference.len());
            let mut found: Vec<i64> = dut.iter().copied().collect();
            let mut expected: Vec<i64> = reference.iter().copied().collect();
            found.sort_unstable();
            expected.sort_unstable();
            assert_eq!(found, expected);
        }
    }
    dut.check();
    assert_eq!(dut.len(), reference.len());
}
