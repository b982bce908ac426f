//! Objects that outgrow their region move; everything else stays put.

use std::sync::Arc;

use crate::config::IndexConfig;
use crate::store::{DiskPtr, FileStore};
use crate::testing::temp_store_path;

fn config() -> IndexConfig {
    IndexConfig::default().with_metadata_size(8 * 1024)
}

#[test]
fn test_grow_relocates_and_neighbours_survive() {
    let (_dir, path) = temp_store_path("relocate.db");
    let (grown, neighbours) = {
        let mut store = FileStore::create_with(&path, &config()).expect("create");
        let neighbours: Vec<_> = (0..5u64)
            .map(|i| store.insert(format!("neighbour {i}")).expect("insert").0)
            .collect();
        let (grown, _) = store.insert(String::from("small")).expect("insert");
        let after: Vec<_> = (5..8u64)
            .map(|i| store.insert(format!("neighbour {i}")).expect("insert").0)
            .collect();

        let before = store.region(grown).expect("region");
        store.store(grown, "large ".repeat(50)).expect("grow");
        let moved = store.region(grown).expect("region");
        assert_ne!(moved.offset, before.offset);
        assert!(moved.size > before.size);

        store.close().expect("close");
        (grown, neighbours.into_iter().chain(after).collect::<Vec<_>>())
    };

    let mut store = FileStore::open(&path).expect("open");
    let value: Arc<String> = store.read(grown).expect("read grown");
    assert_eq!(value.as_str(), "large ".repeat(50));
    for (i, label) in neighbours.into_iter().enumerate() {
        let value: Arc<String> = store.read(label).expect("read neighbour");
        assert_eq!(value.as_str(), format!("neighbour {i}"));
    }
}

#[test]
fn test_vacated_region_is_reused() {
    let (_dir, path) = temp_store_path("reuse.db");
    let mut store = FileStore::create_with(&path, &config()).expect("create");

    let (first, _) = store.insert(vec![0u8; 64]).expect("insert");
    let (_second, _) = store.insert(vec![1u8; 64]).expect("insert");
    let old = store.region(first).expect("region");

    store.store(first, vec![2u8; 256]).expect("grow");
    let frontier = store.allocator().frontier();

    let (third, _) = store.insert(vec![3u8; 16]).expect("insert small");
    assert_eq!(store.region(third).expect("region").offset, old.offset);
    assert_eq!(store.allocator().frontier(), frontier);
}

#[test]
fn test_delete_at_tail_pulls_frontier_back() {
    let (_dir, path) = temp_store_path("tail.db");
    let mut store = FileStore::create_with(&path, &config()).expect("create");

    let (_first, _) = store.insert(7u64).expect("insert");
    let frontier = store.allocator().frontier();
    let (last, _) = store.insert(vec![0u8; 100]).expect("insert");
    assert!(store.allocator().frontier() > frontier);

    store.delete(last).expect("delete");
    assert_eq!(store.allocator().frontier(), frontier);
    assert_eq!(store.allocator().free_bytes(), 0);
    assert!(store.read::<Vec<u8>>(last).expect_err("deleted").is_invalid_access());
}

#[test]
fn test_deleting_parent_releases_children() {
    let (_dir, path) = temp_store_path("cascade.db");
    let mut store = FileStore::create_with(&path, &config()).expect("create");

    let leaf = DiskPtr::new_in(&mut store, String::from("leaf")).expect("leaf");
    let middle = DiskPtr::new_in(&mut store, vec![leaf.clone()]).expect("middle");
    let (top, _) = store.insert(Some(middle.clone())).expect("top");
    assert_eq!(store.allocator().label_count(), 3);

    store.delete(top).expect("delete top");
    assert_eq!(store.allocator().label_count(), 0);
    assert!(!store.allocator().is_live(middle.label()));
    assert!(!store.allocator().is_live(leaf.label()));
}
