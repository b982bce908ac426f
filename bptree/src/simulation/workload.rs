//! Seeded random workloads checked against simple models.
//!
//! The tree workload mirrors every operation into a `BTreeMap` and runs the
//! invariant checker after each one. The store workload mirrors objects
//! into a `HashMap` and checks the allocator's regions never overlap.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::storage::{FaultConfig, SimulatedStorage};
use crate::config::IndexConfig;
use crate::store::{FileStore, Label, Storage, StorageError, StoreError};
use crate::tree::{Btree, TreeError};

/// Parameters of a tree workload.
#[derive(Debug, Clone)]
pub struct TreeWorkload {
    pub seed: u64,
    pub order: usize,
    pub operations: usize,
    /// Keys are drawn from `0..key_space`.
    pub key_space: u32,
}

impl TreeWorkload {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            order: 4,
            operations: 2000,
            key_space: 300,
        }
    }

    #[must_use]
    pub const fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn with_operations(mut self, operations: usize) -> Self {
        self.operations = operations;
        self
    }
}

/// Counts from a completed workload.
#[derive(Debug, Default, Clone)]
pub struct WorkloadReport {
    pub adds: usize,
    pub duplicates: usize,
    pub removes: usize,
    pub modifies: usize,
    pub searches: usize,
    pub max_height: usize,
}

/// Run a tree workload, returning the first divergence from the model.
pub fn run_tree_workload(config: &TreeWorkload) -> Result<(Btree<u32, u64>, WorkloadReport), String> {
    let fail = |step: usize, message: String| format!("seed {} step {step}: {message}", config.seed);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut tree = Btree::new(config.order).map_err(|e| fail(0, e.to_string()))?;
    let mut model: BTreeMap<u32, u64> = BTreeMap::new();
    let mut report = WorkloadReport::default();

    for step in 0..config.operations {
        let key = rng.random_range(0..config.key_space);
        match rng.random_range(0..10u8) {
            0..=3 => {
                let value = rng.random::<u64>();
                match (tree.add(key, value), model.contains_key(&key)) {
                    (Ok(()), false) => {
                        model.insert(key, value);
                        report.adds += 1;
                    }
                    (Err(TreeError::DuplicateKey(k)), true) if k == key => report.duplicates += 1,
                    (result, present) => {
                        return Err(fail(step, format!("add {key}: {result:?}, model has it: {present}")));
                    }
                }
            }
            4..=6 => {
                let removed = tree.remove(&key);
                let expected = model.remove(&key);
                if removed != expected {
                    return Err(fail(step, format!("remove {key}: {removed:?} vs {expected:?}")));
                }
                report.removes += 1;
            }
            7 => {
                let value = rng.random::<u64>();
                let result = tree.modify(&key, value).ok();
                let expected = model.get_mut(&key).map(|slot| std::mem::replace(slot, value));
                if result != expected {
                    return Err(fail(step, format!("modify {key}: {result:?} vs {expected:?}")));
                }
                report.modifies += 1;
            }
            _ => {
                let found = tree.search(&key).ok().copied();
                if found != model.get(&key).copied() || tree.have(&key) != found.is_some() {
                    return Err(fail(step, format!("search {key}: {found:?}")));
                }
                report.searches += 1;
            }
        }

        tree.check_invariants()
            .map_err(|violation| fail(step, violation.to_string()))?;
        if tree.len() != model.len() {
            return Err(fail(step, format!("len {} vs {}", tree.len(), model.len())));
        }
        report.max_height = report.max_height.max(tree.height());
    }

    let keys: Vec<u32> = model.keys().copied().collect();
    if tree.explore() != keys {
        return Err(fail(config.operations, "explore differs from model".to_string()));
    }
    Ok((tree, report))
}

/// Parameters of a store workload.
#[derive(Debug, Clone)]
pub struct StoreWorkload {
    pub seed: u64,
    pub operations: usize,
    /// Reopen the store from its metadata every this many operations.
    /// Ignored when faults are injected.
    pub reopen_every: usize,
    pub faults: FaultConfig,
}

impl StoreWorkload {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            operations: 1000,
            reopen_every: 250,
            faults: FaultConfig::no_faults(),
        }
    }

    #[must_use]
    pub const fn with_faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }
}

/// Counts from a completed store workload.
#[derive(Debug, Default, Clone)]
pub struct StoreReport {
    pub writes: usize,
    pub deletes: usize,
    pub reads: usize,
    pub reopens: usize,
    /// Operations that returned an injected storage fault.
    pub surfaced_faults: usize,
}

/// Run a store workload over simulated storage.
///
/// Objects whose write failed are dropped from the model, since their
/// content is unresolved. Any error other than an injected fault is a
/// failure.
pub fn run_store_workload(config: &StoreWorkload) -> Result<StoreReport, String> {
    let fail = |step: usize, message: String| format!("seed {} step {step}: {message}", config.seed);
    let faulty = config.faults.read_error_rate > 0.0
        || config.faults.write_error_rate > 0.0
        || config.faults.torn_write_rate > 0.0
        || config.faults.sync_error_rate > 0.0;

    let store_config = IndexConfig::default()
        .with_metadata_size(32 * 1024)
        .with_cache_capacity(16);
    let mut storage = SimulatedStorage::new(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model: HashMap<Label, Vec<u8>> = HashMap::new();
    let mut report = StoreReport::default();

    let mut store = FileStore::init(&mut storage, &store_config).map_err(|e| fail(0, e.to_string()))?;
    store.storage_mut().set_fault_config(config.faults.clone());
    for step in 0..config.operations {
        if !faulty && step > 0 && step % config.reopen_every == 0 {
            store.close().map_err(|e| fail(step, e.to_string()))?;
            store = FileStore::load(&mut storage, &store_config).map_err(|e| fail(step, e.to_string()))?;
            report.reopens += 1;
        }

        let existing = pick_label(&mut rng, &model);
        let outcome = match (rng.random_range(0..10u8), existing) {
            (0..=3, _) | (_, None) => {
                let value = random_bytes(&mut rng);
                let label = store.new_object();
                let result = store.write(label, &value);
                report.writes += 1;
                settle_write(&mut model, label, value, result)
            }
            (4..=5, Some(label)) => {
                let value = random_bytes(&mut rng);
                let result = store.store(label, value.clone()).map(|_| ());
                report.writes += 1;
                settle_write(&mut model, label, value, result)
            }
            (6, Some(label)) => {
                model.remove(&label);
                report.deletes += 1;
                store.delete(label)
            }
            (_, Some(label)) => {
                report.reads += 1;
                match store.read::<Vec<u8>>(label) {
                    Ok(value) if Some(value.as_ref()) == model.get(&label) => Ok(()),
                    Ok(value) => {
                        return Err(fail(step, format!("label {label} read {} bytes", value.len())));
                    }
                    Err(e) => Err(e),
                }
            }
        };

        match outcome {
            Ok(()) => {}
            Err(StoreError::Storage(StorageError::InjectedFault(_))) => report.surfaced_faults += 1,
            Err(e) => return Err(fail(step, e.to_string())),
        }
        check_regions(&store).map_err(|message| fail(step, message))?;
    }

    if faulty {
        drop(store);
    } else {
        store.close().map_err(|e| fail(config.operations, e.to_string()))?;
        let mut store =
            FileStore::load(&mut storage, &store_config).map_err(|e| fail(config.operations, e.to_string()))?;
        for (label, expected) in &model {
            let value: Arc<Vec<u8>> = store.read(*label).map_err(|e| fail(config.operations, e.to_string()))?;
            if value.as_ref() != expected {
                return Err(fail(config.operations, format!("label {label} differs after reopen")));
            }
        }
        store.close().map_err(|e| fail(config.operations, e.to_string()))?;
    }
    Ok(report)
}

fn settle_write(
    model: &mut HashMap<Label, Vec<u8>>,
    label: Label,
    value: Vec<u8>,
    result: Result<(), StoreError>,
) -> Result<(), StoreError> {
    match result {
        Ok(()) => {
            model.insert(label, value);
            Ok(())
        }
        Err(e) => {
            model.remove(&label);
            Err(e)
        }
    }
}

fn pick_label(rng: &mut StdRng, model: &HashMap<Label, Vec<u8>>) -> Option<Label> {
    if model.is_empty() {
        return None;
    }
    let mut labels: Vec<Label> = model.keys().copied().collect();
    labels.sort_unstable();
    Some(labels[rng.random_range(0..labels.len())])
}

fn random_bytes(rng: &mut StdRng) -> Vec<u8> {
    let len = rng.random_range(0..200usize);
    (0..len).map(|_| rng.random::<u8>()).collect()
}

/// Live regions stay inside the data area and never overlap.
fn check_regions<S: Storage>(store: &FileStore<S>) -> Result<(), String> {
    let allocator = store.allocator();
    let mut regions = Vec::new();
    for label in allocator.labels() {
        let region = allocator.region(label).map_err(|e| e.to_string())?;
        if region.offset < allocator.data_start() || region.end() > allocator.frontier() {
            return Err(format!("label {label} region {region:?} outside data area"));
        }
        regions.push((region, label));
    }
    regions.sort_unstable_by_key(|(region, _)| region.offset);
    for pair in regions.windows(2) {
        if pair[0].0.end() > pair[1].0.offset {
            return Err(format!("labels {} and {} overlap", pair[0].1, pair[1].1));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_workload_same_seed_same_tree() {
        let config = TreeWorkload::new(11).with_operations(500);
        let (first, _) = run_tree_workload(&config).expect("first run");
        let (second, _) = run_tree_workload(&config).expect("second run");
        assert_eq!(first.explore(), second.explore());
        assert_eq!(first.height(), second.height());
    }
}
