//! Deterministic simulation of the tree and the file store.
//!
//! - Seeded random operation streams checked against std collections
//! - In-memory storage with fault injection
//! - Invariant checks after every operation
//!
//! Given the same seed, a run is identical, so a failing seed can be
//! replayed directly.

mod storage;
mod workload;

pub use storage::{FaultConfig, SimulatedStorage};
pub use workload::{StoreWorkload, TreeWorkload, run_store_workload, run_tree_workload};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::store::metadata::HEADER_SIZE;
    use crate::store::{FileStore, MetadataError, StoreError};
    use crate::testing::init_tracing;

    #[test]
    fn test_tree_workload_many_seeds() {
        init_tracing();
        for seed in 0..8 {
            for order in [3, 4, 5, 8] {
                let config = TreeWorkload::new(seed).with_order(order);
                let (_, report) = run_tree_workload(&config).unwrap_or_else(|e| panic!("{e}"));
                assert!(report.adds > 0 && report.removes > 0, "seed {seed} order {order}");
            }
        }
    }

    #[test]
    fn test_tree_workload_grows_and_shrinks() {
        let config = TreeWorkload::new(99).with_order(3).with_operations(4000);
        let (tree, report) = run_tree_workload(&config).unwrap_or_else(|e| panic!("{e}"));
        assert!(report.max_height >= 3, "max height {}", report.max_height);
        assert!(tree.height() <= report.max_height);
    }

    #[test]
    fn test_store_workload_without_faults() {
        init_tracing();
        for seed in 0..4 {
            let report = run_store_workload(&StoreWorkload::new(seed)).unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(report.surfaced_faults, 0);
            assert!(report.reopens > 0);
        }
    }

    #[test]
    fn test_store_workload_surfaces_faults() {
        let mut surfaced = 0;
        for seed in 0..4 {
            let config = StoreWorkload::new(seed).with_faults(FaultConfig::low_faults());
            let report = run_store_workload(&config).unwrap_or_else(|e| panic!("{e}"));
            surfaced += report.surfaced_faults;
        }
        assert!(surfaced > 0);
    }

    #[test]
    fn test_flipped_metadata_byte_fails_load() {
        let config = IndexConfig::default().with_metadata_size(4096);
        let mut storage = SimulatedStorage::new(7);
        {
            let mut store = FileStore::init(&mut storage, &config).expect("init");
            store.insert(String::from("payload")).expect("insert");
            store.close().expect("close");
        }
        FileStore::load(&mut storage, &config)
            .expect("intact store loads")
            .close()
            .expect("close");

        storage.corrupt_byte(HEADER_SIZE);
        let result = FileStore::load(&mut storage, &config);
        assert!(matches!(
            result,
            Err(StoreError::Metadata(MetadataError::ChecksumMismatch { .. }))
        ));
    }
}
