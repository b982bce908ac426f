//! Removing a key makes it absent and shrinks `explore()` by exactly one.

use crate::tree::{Btree, TreeError};

#[test]
fn test_remove_each_key_in_turn() {
    for order in [3, 4, 7] {
        let mut tree: Btree<u32, u32> = Btree::new(order).expect("tree");
        for key in 0..60 {
            tree.add(key, key).expect("add");
        }

        // Alternate ends so both merge directions and steals happen.
        let mut order_of_removal: Vec<u32> = Vec::new();
        let (mut low, mut high) = (0u32, 59u32);
        while low <= high {
            order_of_removal.push(low);
            if low != high {
                order_of_removal.push(high);
            }
            low += 1;
            high = high.saturating_sub(1);
        }

        for key in order_of_removal {
            let before = tree.explore().len();
            assert_eq!(tree.remove(&key), Some(key));
            assert!(!tree.have(&key));
            assert_eq!(tree.search(&key), Err(TreeError::NotFound));
            assert_eq!(tree.explore().len(), before - 1, "order {order} key {key}");
            tree.check_invariants().expect("valid");
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
    }
}

#[test]
fn test_underflow_forces_rebalance() {
    let mut tree: Btree<u32, u32> = Btree::new(4).expect("tree");
    for key in 0..16 {
        tree.add(key, key).expect("add");
    }
    let leaves = tree.leaf_count();

    // Emptying most of the first leaf takes it below ceil(4/2).
    tree.remove(&0);
    tree.remove(&1);
    tree.remove(&2);
    tree.check_invariants().expect("valid");
    assert!(tree.leaf_count() <= leaves);
    assert_eq!(tree.explore(), (3..16).collect::<Vec<_>>());
}

#[test]
fn test_duplicate_add_changes_nothing() {
    let mut tree: Btree<u32, &str> = Btree::new(3).expect("tree");
    for key in 0..10 {
        tree.add(key, "x").expect("add");
    }
    let before = tree.explore();
    assert_eq!(tree.add(4, "y"), Err(TreeError::DuplicateKey(4)));
    assert_eq!(tree.explore(), before);
    assert_eq!(tree.len(), 10);
    assert_eq!(tree.search(&4), Ok(&"x"));
}

#[test]
fn test_modify_keeps_shape() {
    let mut tree: Btree<u32, u32> = Btree::new(4).expect("tree");
    for key in 0..30 {
        tree.add(key, 0).expect("add");
    }
    let height = tree.height();
    let leaves = tree.leaf_count();
    for key in 0..30 {
        assert_eq!(tree.modify(&key, key + 1), Ok(0));
    }
    assert_eq!(tree.modify(&99, 1), Err(TreeError::NotFound));
    assert_eq!(tree.height(), height);
    assert_eq!(tree.leaf_count(), leaves);
    assert_eq!(tree.search(&10), Ok(&11));
}
