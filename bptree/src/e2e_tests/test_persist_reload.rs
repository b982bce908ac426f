//! Save a tree to a file, reopen it, and keep using it.

use crate::config::IndexConfig;
use crate::persistence::PersistError;
use crate::store::{FileStore, StoreError};
use crate::testing::{init_tracing, temp_store_path};
use crate::tree::Btree;

const KEYS: u64 = 500;

fn config() -> IndexConfig {
    IndexConfig::default().with_order(5).with_cache_capacity(32)
}

fn build() -> Btree<u64, String> {
    let mut tree = Btree::with_config(&config()).expect("tree");
    for key in (0..KEYS).map(|k| k * 2) {
        tree.add(key, format!("value {key}")).expect("add");
    }
    tree
}

#[test]
fn test_reload_finds_every_key() {
    init_tracing();
    let (_dir, path) = temp_store_path("reload.db");
    let tree = build();
    {
        let mut store = FileStore::create_with(&path, &config()).expect("create");
        tree.save(&mut store).expect("save");
        store.close().expect("close");
    }

    let mut store = FileStore::open_with(&path, &config()).expect("open");
    let loaded: Btree<u64, String> = Btree::load_root(&mut store).expect("load");
    assert_eq!(loaded.len(), tree.len());
    assert_eq!(loaded.order(), 5);
    for key in (0..KEYS).map(|k| k * 2) {
        assert!(loaded.have(&key));
        assert_eq!(loaded.search(&key).expect("search"), &format!("value {key}"));
    }
    for key in (0..KEYS).map(|k| k * 2 + 1) {
        assert!(!loaded.have(&key));
    }
}

#[test]
fn test_reloaded_tree_accepts_inserts_and_splits() {
    let (_dir, path) = temp_store_path("grow.db");
    {
        let mut store = FileStore::create_with(&path, &config()).expect("create");
        build().save(&mut store).expect("save");
        store.close().expect("close");
    }

    let mut store = FileStore::open(&path).expect("open");
    let mut tree: Btree<u64, String> = Btree::load_root(&mut store).expect("load");
    let height = tree.height();
    for key in (0..KEYS).map(|k| k * 2 + 1) {
        tree.add(key, format!("odd {key}")).expect("add odd");
    }
    tree.check_invariants().expect("valid after inserts");
    assert_eq!(tree.len() as u64, KEYS * 2);
    assert!(tree.height() >= height);
    assert_eq!(tree.explore(), (0..KEYS * 2).collect::<Vec<_>>());

    tree.save(&mut store).expect("save again");
    store.close().expect("close");

    let mut store = FileStore::open(&path).expect("reopen");
    let reloaded: Btree<u64, String> = Btree::load_root(&mut store).expect("reload");
    assert_eq!(reloaded.explore(), tree.explore());
    assert_eq!(reloaded.search(&7).expect("search"), "odd 7");
}

#[test]
fn test_resave_reclaims_space() {
    let (_dir, path) = temp_store_path("resave.db");
    let mut store = FileStore::create_with(&path, &config()).expect("create");
    let mut tree = build();
    tree.save(&mut store).expect("save");
    let labels = store.allocator().label_count();

    // The second copy is written before the first is released.
    tree.save(&mut store).expect("save unchanged");
    assert_eq!(store.allocator().label_count(), labels);
    assert!(store.allocator().free_bytes() > 0);

    for key in (0..KEYS).map(|k| k * 2).filter(|k| k % 3 == 0) {
        tree.remove(&key);
    }
    tree.save(&mut store).expect("save after removals");
    assert!(store.allocator().label_count() <= labels);

    let loaded: Btree<u64, String> = Btree::load_root(&mut store).expect("load");
    assert_eq!(loaded.explore(), tree.explore());
}

#[test]
fn test_open_rejects_foreign_file() {
    let (_dir, path) = temp_store_path("foreign.db");
    std::fs::write(&path, vec![0xAB; 128]).expect("write file");
    let result = FileStore::open(&path);
    assert!(matches!(result, Err(StoreError::Metadata(_))));
}

#[test]
fn test_empty_store_has_no_root() {
    let (_dir, path) = temp_store_path("empty.db");
    let mut store = FileStore::create(&path).expect("create");
    let result = Btree::<u64, String>::load_root(&mut store);
    assert!(matches!(result, Err(PersistError::MissingRoot)));
}
