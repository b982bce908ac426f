//! Order 4, keys 1..=10 inserted ascending.

use crate::tree::Btree;

#[test]
fn test_first_split_on_fifth_key() {
    let mut tree: Btree<u32, u32> = Btree::new(4).expect("tree");
    for key in 1..=4 {
        tree.add(key, key * 100).expect("add");
    }
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.root_fanout(), 4);

    tree.add(5, 500).expect("add 5");
    assert_eq!(tree.height(), 2);
    assert_eq!(tree.root_fanout(), 2);
    assert_eq!(tree.leaf_count(), 2);
}

#[test]
fn test_explore_after_ten_keys() {
    let mut tree: Btree<u32, u32> = Btree::new(4).expect("tree");
    for key in 1..=10 {
        tree.add(key, key * 100).expect("add");
        assert_eq!(tree.search(&key).expect("search"), &(key * 100));
        tree.check_invariants().expect("valid");
    }
    assert_eq!(tree.explore(), (1..=10).collect::<Vec<_>>());
    assert_eq!(tree.len(), 10);
}

#[test]
fn test_every_key_searchable_after_splits() {
    for order in 3..=6 {
        let mut tree: Btree<u32, String> = Btree::new(order).expect("tree");
        let last = u32::try_from(order * 4).expect("small order");
        for key in 0..=last {
            tree.add(key, key.to_string()).expect("add");
        }
        for key in 0..=last {
            assert_eq!(tree.search(&key).expect("search"), &key.to_string(), "order {order}");
        }
        assert!(tree.height() >= 2, "order {order}");
    }
}
