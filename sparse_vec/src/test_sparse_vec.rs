#![cfg(test)]
#![allow(missing_docs)]
use crate::{SparseVec, GROUP_SIZE};
use rand::prelude::*;
use std::io::Cursor;

#[test]
fn group_boundary_resize() {
    let mut vec: SparseVec<i32> = SparseVec::with_len(70);
    for slot in [12, 47, 48, 49] {
        assert_eq!(vec.set(slot, -(slot as i32)), None);
    }
    vec.check();
    assert_eq!(vec.num_nonempty(), 4);

    vec.resize(48);
    vec.check();
    assert_eq!(vec.len(), 48);
    assert_eq!(vec.num_nonempty(), 2);
    assert_eq!(vec.get(12), Some(&-12));
    assert_eq!(vec.get(47), Some(&-47));

    vec.resize(70);
    vec.check();
    assert_eq!(vec.num_nonempty(), 2);
    assert_eq!(vec.get(48), None);
    assert_eq!(vec.get(49), None);

    assert_eq!(vec.remove(12), Some(-12));
    vec.check();
    assert_eq!(vec.num_nonempty(), 1);
}

#[test]
fn set_replaces_and_remove_empties() {
    let mut vec: SparseVec<String> = SparseVec::with_len(100);
    assert_eq!(vec.set(4, "foo".to_string()), None);
    assert_eq!(vec.set(4, "bar".to_string()), Some("foo".to_string()));
    assert_eq!(vec.num_nonempty(), 1);
    assert!(vec.contains(4));
    assert!(!vec.contains(5));
    assert_eq!(vec.remove(4), Some("bar".to_string()));
    assert_eq!(vec.remove(4), None);
    assert_eq!(vec.num_nonempty(), 0);
    vec.check();
}

#[test]
fn slot_iteration() {
    let mut vec: SparseVec<u32> = SparseVec::with_len(3 * GROUP_SIZE);
    let slots = [0, 1, 17, GROUP_SIZE - 1, GROUP_SIZE, 2 * GROUP_SIZE + 5];
    for &slot in &slots {
        vec.set(slot, slot as u32);
    }

    let present: Vec<_> = vec
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.map(|&value| (index, value)))
        .collect();
    assert_eq!(
        present,
        slots.map(|slot| (slot, slot as u32)).to_vec(),
    );

    assert_eq!(vec.iter().len(), 3 * GROUP_SIZE);
    assert_eq!(vec.values().len(), slots.len());
    assert!(vec.values().copied().eq(slots.map(|slot| slot as u32)));

    // nth repositions without visiting the skipped slots
    let mut iter = vec.iter();
    assert_eq!(iter.nth(GROUP_SIZE), Some(Some(&(GROUP_SIZE as u32))));
    assert_eq!(iter.next(), Some(None));

    for value in vec.values_mut() {
        *value *= 2;
    }
    assert_eq!(vec.get(17), Some(&34));
}

#[test]
fn into_values_drains_in_order() {
    let mut vec: SparseVec<u64> = SparseVec::with_len(200);
    for slot in (0..200).step_by(7) {
        vec.set(slot, slot as u64);
    }
    let drained: Vec<_> = vec.into_values().collect();
    assert!(drained.iter().copied().eq((0..200).step_by(7).map(|s| s as u64)));
}

#[test]
fn equality_and_clone() {
    let mut a: SparseVec<u16> = SparseVec::with_len(96);
    let mut b: SparseVec<u16> = SparseVec::with_len(96);
    for slot in [3, 50, 95] {
        a.set(slot, slot as u16);
        b.set(slot, slot as u16);
    }
    assert_eq!(a, b);
    b.set(50, 1);
    assert_ne!(a, b);

    let c = a.clone();
    assert_eq!(a, c);
    assert_eq!(c.num_nonempty(), 3);

    // same contents but different length compare unequal
    let mut d = a.clone();
    d.resize(97);
    assert_ne!(a, d);
}

#[test]
fn serialization_round_trip() {
    let mut vec: SparseVec<i32> = SparseVec::with_len(170);
    let mut rng = rand_pcg::Pcg64::seed_from_u64(42);
    for _ in 0..60 {
        vec.set(rng.gen_range(0..170), rng.gen());
    }

    let mut stream = Vec::new();
    vec.write_metadata(&mut stream).unwrap();
    vec.write_nopointer_data(&mut stream).unwrap();

    let mut restored: SparseVec<i32> = SparseVec::new();
    let mut cursor = Cursor::new(stream);
    restored.read_metadata(&mut cursor).unwrap();
    assert_eq!(restored.len(), vec.len());
    assert_eq!(restored.num_nonempty(), vec.num_nonempty());
    restored.read_nopointer_data(&mut cursor).unwrap();
    restored.check();
    assert_eq!(restored, vec);
}

#[test]
fn corrupt_metadata_is_rejected() {
    let mut vec: SparseVec<u32> = SparseVec::with_len(50);
    vec.set(10, 1);
    vec.set(20, 2);

    let mut stream = Vec::new();
    vec.write_metadata(&mut stream).unwrap();

    // break the group count so it no longer matches the bitmap
    stream[16] ^= 1;
    let mut restored: SparseVec<u32> = SparseVec::new();
    let err = restored
        .read_metadata(&mut Cursor::new(stream))
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn randomized_against_reference() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(7);
    let mut dut: SparseVec<u64> = SparseVec::with_len(300);
    let mut reference: Vec<Option<u64>> = vec![None; 300];

    for step in 0..3000 {
        match rng.gen_range(0..10) {
            0..=4 => {
                let index = rng.gen_range(0..reference.len());
                let value = rng.gen();
                assert_eq!(dut.set(index, value), reference[index].replace(value));
            }
            5..=7 => {
                let index = rng.gen_range(0..reference.len());
                assert_eq!(dut.remove(index), reference[index].take());
            }
            8 => {
                let index = rng.gen_range(0..reference.len());
                assert_eq!(dut.get(index), reference[index].as_ref());
            }
            _ => {
                let new_len = rng.gen_range(1..400);
                dut.resize(new_len);
                reference.resize(new_len, None);
            }
        }
        if step % 100 == 0 {
            dut.check();
            assert!(dut.iter().eq(reference.iter().map(Option::as_ref)));
        }
    }
    dut.check();
    assert!(dut.iter().eq(reference.iter().map(Option::as_ref)));
}
