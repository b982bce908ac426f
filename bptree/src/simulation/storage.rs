//! In-memory `Storage` with seeded fault injection.
//!
//! Faults are surfaced as `StorageError::InjectedFault`:
//! - read errors (nothing is read)
//! - write errors (nothing is written)
//! - torn writes (a prefix is written, then the error is returned)
//! - sync errors

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::store::{Storage, StorageError};

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a write error (0.0 - 1.0).
    pub write_error_rate: f64,
    /// Probability of a torn write (0.0 - 1.0).
    pub torn_write_rate: f64,
    /// Probability of a sync error (0.0 - 1.0).
    pub sync_error_rate: f64,
}

impl FaultConfig {
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn low_faults() -> Self {
        Self {
            read_error_rate: 0.01,
            write_error_rate: 0.01,
            torn_write_rate: 0.01,
            sync_error_rate: 0.01,
        }
    }
}

/// Statistics about simulated storage operations.
#[derive(Debug, Default, Clone)]
pub struct SimulatedStorageStats {
    pub reads: u64,
    pub writes: u64,
    pub syncs: u64,
    pub injected_read_errors: u64,
    pub injected_write_errors: u64,
    pub torn_writes: u64,
    pub injected_sync_errors: u64,
}

impl SimulatedStorageStats {
    /// Total number of faults injected.
    #[must_use]
    pub const fn injected(&self) -> u64 {
        self.injected_read_errors
            + self.injected_write_errors
            + self.torn_writes
            + self.injected_sync_errors
    }
}

/// Byte vector standing in for a file.
///
/// Not thread-safe; the simulation runs on one thread.
#[derive(Debug)]
pub struct SimulatedStorage {
    bytes: Vec<u8>,
    fault_config: FaultConfig,
    rng: StdRng,
    stats: SimulatedStorageStats,
}

impl SimulatedStorage {
    /// Create an empty storage with no faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    /// Create an empty storage with custom fault configuration.
    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            bytes: Vec::new(),
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: SimulatedStorageStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &SimulatedStorageStats {
        &self.stats
    }

    pub const fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// Flip one byte, for corruption tests.
    pub fn corrupt_byte(&mut self, offset: usize) {
        if let Some(byte) = self.bytes.get_mut(offset) {
            *byte ^= 0xFF;
        }
    }

    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }

    fn write_bytes(&mut self, start: usize, data: &[u8]) {
        let end = start + data.len();
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(data);
    }
}

fn to_index(offset: u64) -> Result<usize, StorageError> {
    usize::try_from(offset)
        .map_err(|_| StorageError::InjectedFault(format!("offset {offset} does not fit in memory")))
}

impl Storage for SimulatedStorage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        self.stats.reads += 1;
        let len = buf.len() as u64;
        if offset.saturating_add(len) > self.len() {
            return Err(StorageError::OutOfBounds {
                offset,
                len,
                size: self.len(),
            });
        }
        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.stats.injected_read_errors += 1;
            return Err(StorageError::InjectedFault("simulated read error".to_string()));
        }
        let start = to_index(offset)?;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        self.stats.writes += 1;
        if self.should_inject_fault(self.fault_config.write_error_rate) {
            self.stats.injected_write_errors += 1;
            return Err(StorageError::InjectedFault("simulated write error".to_string()));
        }
        let start = to_index(offset)?;
        if !data.is_empty() && self.should_inject_fault(self.fault_config.torn_write_rate) {
            self.stats.torn_writes += 1;
            let cutoff = self.rng.random_range(0..data.len());
            self.write_bytes(start, &data[..cutoff]);
            return Err(StorageError::InjectedFault("simulated torn write".to_string()));
        }
        self.write_bytes(start, data);
        Ok(())
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.stats.syncs += 1;
        if self.should_inject_fault(self.fault_config.sync_error_rate) {
            self.stats.injected_sync_errors += 1;
            return Err(StorageError::InjectedFault("simulated sync error".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_extends_and_reads_back() {
        let mut storage = SimulatedStorage::new(1);
        storage.write_at(4, b"abcd").expect("write");
        assert_eq!(storage.len(), 8);

        let mut buf = [0u8; 8];
        storage.read_at(0, &mut buf).expect("read");
        assert_eq!(&buf, b"\0\0\0\0abcd");
    }

    #[test]
    fn test_read_past_end() {
        let mut storage = SimulatedStorage::new(1);
        let mut buf = [0u8; 1];
        assert!(matches!(
            storage.read_at(0, &mut buf),
            Err(StorageError::OutOfBounds { size: 0, .. })
        ));
    }

    #[test]
    fn test_same_seed_same_faults() {
        let run = |seed| {
            let mut storage = SimulatedStorage::with_config(seed, FaultConfig::low_faults());
            (0..2000u64)
                .map(|i| storage.write_at(i, &[1]).is_err())
                .collect::<Vec<_>>()
        };
        let first = run(7);
        assert_eq!(first, run(7));
        assert!(first.iter().any(|failed| *failed));
    }

    #[test]
    fn test_always_failing_write_leaves_bytes() {
        let mut storage = SimulatedStorage::with_config(
            3,
            FaultConfig {
                write_error_rate: 1.0,
                ..FaultConfig::default()
            },
        );
        assert!(storage.write_at(0, b"data").is_err());
        assert!(storage.is_empty());
        assert_eq!(storage.stats().injected(), 1);
    }
}
