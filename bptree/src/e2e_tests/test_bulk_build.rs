//! Bulk construction matches incremental inserts.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::tree::{Btree, TreeError};

#[test]
fn test_bulk_matches_incremental() {
    let mut rng = StdRng::seed_from_u64(7);
    for order in [3, 4, 5, 9] {
        for count in [0u32, 1, 2, 7, 64, 333] {
            let mut entries: Vec<(u32, u32)> = (0..count).map(|k| (k, k * 3)).collect();
            entries.shuffle(&mut rng);

            let bulk = Btree::from_entries(order, entries.clone()).expect("bulk");
            bulk.check_invariants().expect("bulk tree valid");

            let mut incremental = Btree::new(order).expect("tree");
            for (key, value) in entries {
                incremental.add(key, value).expect("add");
            }

            assert_eq!(bulk.explore(), incremental.explore(), "order {order} count {count}");
            assert_eq!(bulk.len(), incremental.len());
            for key in 0..count {
                assert_eq!(bulk.search(&key), Ok(&(key * 3)));
            }
        }
    }
}

#[test]
fn test_bulk_tree_keeps_working() {
    let entries: Vec<(u32, u32)> = (0..100).map(|k| (k * 2, k)).collect();
    let mut tree = Btree::from_entries(4, entries).expect("bulk");
    for key in (0..100).map(|k| k * 2 + 1) {
        tree.add(key, 0).expect("add");
    }
    for key in (0..200).step_by(3) {
        tree.remove(&key);
    }
    tree.check_invariants().expect("valid");
    assert_eq!(tree.len(), 200 - (0..200).step_by(3).count());
}

#[test]
fn test_bulk_duplicate_rejected() {
    let entries = vec![(3u32, 'a'), (1, 'b'), (3, 'c'), (2, 'd')];
    let result = Btree::from_entries(4, entries);
    assert!(matches!(result, Err(TreeError::DuplicateKey(3))));
}
