#![cfg(test)]
#![allow(missing_docs)]
use crate::{key_spec::SelfKey, DenseMap, DenseSet, DenseTable};
use rand::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

#[test]
fn insert_erase_reinsert_cycles() {
    let mut set: DenseSet<i32> = DenseSet::new();
    set.set_empty_key(-1);
    set.set_deleted_key(-2);

    let keys = [
        1, 11, 111, 1111, 11111, 111111, 1111111, 11111111, 111111111, 1111111111,
    ];
    for &key in &keys {
        assert!(set.insert(key));
    }
    assert_eq!(set.len(), 10);

    assert!(set.remove(&11111));
    assert_eq!(set.len(), 9);
    assert!(set.insert(11111));
    assert_eq!(set.len(), 10);
    for _ in 0..3 {
        assert!(set.remove(&11111));
        assert!(set.insert(11111));
        assert_eq!(set.len(), 10);
    }

    assert!(!set.remove(&-11111));
    assert_eq!(set.len(), 10);
    assert!(set.remove(&1));
    assert_eq!(set.len(), 9);
    assert!(set.remove(&1111));
    assert_eq!(set.len(), 8);
    assert!(!set.remove(&2222));
    assert_eq!(set.len(), 8);
    set.check();
}

#[test]
fn small_tables_do_not_shrink() {
    let mut set: DenseSet<i32> = DenseSet::with_capacity(2);
    set.set_empty_key(-1);
    set.set_deleted_key(-2);
    let initial = set.bucket_count();
    assert!(initial < 32);

    for _ in 0..10 {
        assert!(set.insert(4));
        assert!(set.remove(&4));
        assert_eq!(set.bucket_count(), initial);
    }
    set.check();
}

#[test]
fn growth_happens_ahead_of_threshold() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(u32::MAX);
    let initial = set.bucket_count();
    let (_, grow) = set.resizing_parameters();
    let threshold = (initial as f64 * grow) as usize;

    for key in 0..threshold as u32 {
        set.insert(key);
        assert_eq!(set.bucket_count(), initial);
    }
    set.insert(threshold as u32);
    assert!(set.bucket_count() > initial);
    set.check();
}

#[test]
fn equality_ignores_insertion_order() {
    let mut a: DenseMap<u32, u32> = DenseMap::new();
    let mut b: DenseMap<u32, u32> = DenseMap::new();
    a.set_empty_key(u32::MAX);
    b.set_empty_key(u32::MAX);
    for key in 0..100 {
        a.insert(key, key * key);
    }
    for key in (0..100).rev() {
        b.insert(key, key * key);
    }
    assert_eq!(a, b);
    b.insert(200, 1);
    assert_ne!(a, b);

    let a_before = a.clone();
    let b_before = b.clone();
    std::mem::swap(&mut a, &mut b);
    assert_eq!(a, b_before);
    assert_eq!(b, a_before);
}

#[test]
fn clear_no_resize_keeps_bucket_count() {
    let mut set: DenseSet<u64> = DenseSet::new();
    set.set_empty_key(u64::MAX);
    for key in 0..100 {
        set.insert(key);
    }
    let buckets = set.bucket_count();

    set.clear_no_resize();
    assert!(set.is_empty());
    assert_eq!(set.bucket_count(), buckets);

    for key in 0..100 {
        set.insert(key);
    }
    assert_eq!(set.bucket_count(), buckets);
    set.check();
}

#[test]
fn reinsert_reclaims_tombstone() {
    let mut table: DenseTable<SelfKey<i32>> = DenseTable::new();
    table.set_empty_value(-1);
    table.set_deleted_key(-2);

    assert!(table.insert(7).1.is_none());
    assert_eq!(table.nonempty_bucket_count(), 1);

    assert!(table.remove(&7));
    assert_eq!(table.len(), 0);
    assert_eq!(table.find(&7), None);
    // the tombstone still occupies its bucket
    assert_eq!(table.nonempty_bucket_count(), 1);

    let (stored, rejected) = table.insert(7);
    assert_eq!(*stored, 7);
    assert!(rejected.is_none());
    assert_eq!(table.len(), 1);
    assert_eq!(table.nonempty_bucket_count(), 1);
    table.check();
}

#[test]
fn deleted_key_can_change_after_compaction() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(0xefefef);
    set.set_deleted_key(1010101010);
    let before = set.bucket_count();
    // without pending deletions this is free
    set.set_deleted_key(1010101011);
    assert_eq!(set.bucket_count(), before);

    for key in 1..100 {
        set.insert(key);
    }
    for key in 1..50 {
        set.remove(&key);
    }
    set.set_deleted_key(1010101010);
    set.check();
    assert_eq!(set.len(), 50);
    for key in 50..100 {
        assert!(set.contains(&key));
    }
    for key in 1..50 {
        assert!(!set.contains(&key));
    }
}

#[test]
fn clear_resets_to_minimum_size() {
    let mut set: DenseSet<u64> = DenseSet::new();
    set.set_empty_key(u64::MAX);
    for key in 0..100 {
        set.insert(key);
    }
    assert!(set.bucket_count() > 4);

    set.clear();
    assert!(set.is_empty());
    assert_eq!(set.bucket_count(), 4);
    assert!(set.insert(3));
    assert!(set.contains(&3));
    set.check();
}

#[test]
fn resize_zero_applies_pending_shrink() {
    let mut set: DenseSet<u64> = DenseSet::new();
    set.set_empty_key(u64::MAX);
    set.set_deleted_key(u64::MAX - 1);
    for key in 0..1000 {
        set.insert(key);
    }
    assert_eq!(set.bucket_count(), 2048);

    for key in 10..1000 {
        set.remove(&key);
    }
    // shrinking is lazy
    assert_eq!(set.bucket_count(), 2048);
    set.resize(0);
    assert_eq!(set.bucket_count(), 32);
    assert_eq!(set.len(), 10);
    for key in 0..10 {
        assert!(set.contains(&key));
    }
    set.check();
}

#[test]
fn zero_shrink_fraction_disables_shrinking() {
    let mut set: DenseSet<u64> = DenseSet::new();
    set.set_empty_key(u64::MAX);
    set.set_deleted_key(u64::MAX - 1);
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
fn bulk_insert() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(u32::MAX);
    set.extend(0..500);
    assert_eq!(set.len(), 500);
    set.extend(250..750);
    assert_eq!(set.len(), 750);
    set.check();
}

#[test]
fn map_basic() {
    let mut map: DenseMap<String, usize> = DenseMap::new();
    map.set_empty_key(String::new());
    map.set_deleted_key("-deleted-".to_string());

    assert_eq!(map.insert("adam".to_string(), 10), None);
    assert_eq!(map.insert("eve".to_string(), 23), None);
    assert_eq!(map.insert("mallory".to_string(), 40), None);
    assert_eq!(map.insert("jim".to_string(), 5), None);
    assert_eq!(
        map.insert("jim".to_string(), 15),
        Some(("jim".to_string(), 15))
    );
    assert_eq!(map.get("adam"), Some(&10));
    assert_eq!(map.get_key_value("eve"), Some((&"eve".to_string(), &23)));

    *map.get_mut("eve").unwrap() += 1;
    assert_eq!(map.get("eve"), Some(&24));

    assert!(map.remove("mallory"));
    assert!(!map.contains_key("mallory"));
    assert_eq!(map.len(), 3);

    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["adam", "eve", "jim"]);

    for value in map.values_mut() {
        *value += 1;
    }
    assert_eq!(map.get("jim"), Some(&6));
    map.check();
}

#[test]
fn metadata_round_trip() {
    let mut set: DenseSet<i64> = DenseSet::new();
    set.set_empty_key(-1);
    set.set_deleted_key(-2);
    for key in 0..200 {
        set.insert(key);
    }
    for key in 0..50 {
        set.remove(&key);
    }

    let mut stream = Vec::new();
    // compacts, so the stream never contains the deleted sentinel
    set.write_metadata(&mut stream).unwrap();
    set.write_nopointer_data(&mut stream).unwrap();
    assert_eq!(set.len(), 150);

    let mut restored: DenseSet<i64> = DenseSet::new();
    restored.set_empty_key(-1);
    let mut cursor = Cursor::new(stream);
    restored.read_metadata(&mut cursor).unwrap();
    restored.read_nopointer_data(&mut cursor).unwrap();
    restored.check();
    assert_eq!(restored, set);
    for key in 50..200 {
        assert!(restored.contains(&key));
    }
    assert!(!restored.contains(&10));
}

#[test]
fn randomized_set_against_reference() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(25);
    let mut dut: DenseSet<i64> = DenseSet::with_capacity(4);
    dut.set_empty_key(-1);
    dut.set_deleted_key(-2);
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

#[test]
fn randomized_map_against_reference() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(26);
    let mut dut: DenseMap<u32, u64> = DenseMap::new();
    dut.set_empty_key(u32::MAX);
    dut.set_deleted_key(u32::MAX - 1);
    let mut reference: HashMap<u32, u64> = HashMap::new();

    for step in 0..3000 {
        match rng.gen_range(0..10) {
            0..=4 => {
                let key = rng.gen_range(0..300);
                let value = rng.gen();
                let inserted = dut.insert(key, value).is_none();
                if inserted {
                    reference.insert(key, value);
                } else {
                    assert!(reference.contains_key(&key));
                }
            }
            5..=6 => {
                let key = rng.gen_range(0..300);
                assert_eq!(dut.remove(&key), reference.remove(&key).is_some());
            }
            7..=8 => {
                let key = rng.gen_range(0..300);
                assert_eq!(dut.get(&key), reference.get(&key));
            }
            _ => {
                let key = rng.gen_range(0..300);
                if let Some(value) = dut.get_mut(&key) {
                    *value = value.wrapping_add(1);
                    *reference.get_mut(&key).unwrap() = *value;
                }
            }
        }
        if step % 128 == 0 {
            dut.check();
            assert_eq!(dut.len(), reference.len());
        }
    }
    for (key, value) in &reference {
        assert_eq!(dut.get(key), Some(value));
    }
}

#[test]
#[should_panic(expected = "empty value can only be set once")]
fn empty_key_can_only_be_set_once() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(0);
    set.set_empty_key(1);
}

#[test]
#[should_panic(expected = "cannot insert the empty sentinel")]
fn inserting_the_empty_sentinel_panics() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(0);
    set.insert(0);
}

#[test]
#[should_panic(expected = "empty and deleted keys must differ")]
fn sentinel_keys_must_differ() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(0);
    set.set_deleted_key(0);
}

#[test]
#[should_panic(expected = "a deleted key must be set")]
fn removing_without_deleted_key_panics() {
    let mut set: DenseSet<u32> = DenseSet::new();
    set.set_empty_key(0);
    set.insert(1);
    set.remove(&1);
}
