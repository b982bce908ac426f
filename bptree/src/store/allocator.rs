//! Label-based storage allocator.
//!
//! Every stored object is identified by an opaque `Label`. The allocator
//! maps each label to the byte region holding the object, hands out new
//! regions from a monotonic frontier, and keeps regions given back by
//! relocated or deleted objects for later first-fit reuse.
//!
//! Label 0 stands for the file itself and is never handed out.

use std::collections::{BTreeMap, BTreeSet};

use super::bytes::{ByteConverter, ByteReader, ConvertError, ObjectBytes};

/// Opaque identifier of one stored object.
pub type Label = u64;

/// The label reserved for the file itself.
pub const FILE_LABEL: Label = 0;

/// A byte range in the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: u64,
    pub size: u64,
}

impl Region {
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Errors raised by label bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    /// The label was deallocated; using it is a logic error in the caller.
    InvalidAccess(Label),
    /// The label was never handed out.
    UnknownLabel(Label),
    /// The label already has a region; grow it with `resize_space_to`.
    AlreadyPlaced(Label),
    /// Label 0 names the file and owns no region.
    ReservedLabel,
}

impl std::fmt::Display for AllocatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAccess(label) => write!(f, "access to deleted label {label}"),
            Self::UnknownLabel(label) => write!(f, "unknown label {label}"),
            Self::AlreadyPlaced(label) => write!(f, "label {label} already has space"),
            Self::ReservedLabel => write!(f, "label {FILE_LABEL} is reserved for the file"),
        }
    }
}

impl std::error::Error for AllocatorError {}

/// Maps labels to regions of the data area.
///
/// # Invariants
///
/// - Regions in `table` and `free_regions` never overlap
/// - Every region starts at or after `data_start` and ends at or before
///   `frontier`
/// - `free_regions` is sorted by offset and has no adjacent pair
/// - A label is in at most one of `table` and `pending`
/// - Labels below `next_label` in neither are deallocated; labels are
///   never handed out twice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAllocator {
    data_start: u64,
    frontier: u64,
    next_label: Label,
    table: BTreeMap<Label, Region>,
    /// Handed out, not yet given space.
    pending: BTreeSet<Label>,
    free_regions: Vec<Region>,
}

impl StorageAllocator {
    /// Create an allocator whose data region starts at `data_start`.
    #[must_use]
    pub const fn new(data_start: u64) -> Self {
        Self {
            data_start,
            frontier: data_start,
            next_label: FILE_LABEL + 1,
            table: BTreeMap::new(),
            pending: BTreeSet::new(),
            free_regions: Vec::new(),
        }
    }

    /// Hand out a fresh label with no space yet.
    pub fn allocate_label(&mut self) -> Label {
        let label = self.next_label;
        self.next_label += 1;
        self.pending.insert(label);
        label
    }

    /// Returns true if `label` has a region.
    #[must_use]
    pub fn is_ready(&self, label: Label) -> bool {
        self.table.contains_key(&label)
    }

    /// Returns true if `label` is handed out, with or without space.
    #[must_use]
    pub fn is_live(&self, label: Label) -> bool {
        self.table.contains_key(&label) || self.pending.contains(&label)
    }

    /// The region of a label that has been given space.
    pub fn region(&self, label: Label) -> Result<Region, AllocatorError> {
        self.check_usable(label)?;
        self.table
            .get(&label)
            .copied()
            .ok_or(AllocatorError::UnknownLabel(label))
    }

    /// Give first space to `label`, returning the offset.
    pub fn give_space_to(&mut self, label: Label, size: u64) -> Result<u64, AllocatorError> {
        self.check_usable(label)?;
        if self.table.contains_key(&label) {
            return Err(AllocatorError::AlreadyPlaced(label));
        }
        if !self.pending.remove(&label) {
            return Err(AllocatorError::UnknownLabel(label));
        }
        let offset = self.take_free(size).unwrap_or_else(|| self.take_frontier(size));
        self.table.insert(label, Region { offset, size });
        Ok(offset)
    }

    /// Move `label` to a new region of `bigger_size` at the frontier.
    ///
    /// The old region is queued for reuse.
    pub fn resize_space_to(&mut self, label: Label, bigger_size: u64) -> Result<u64, AllocatorError> {
        let old = self.region(label)?;
        let offset = self.take_frontier(bigger_size);
        self.table.insert(
            label,
            Region {
                offset,
                size: bigger_size,
            },
        );
        self.release_region(old);
        Ok(offset)
    }

    /// Retire `label`, returning its region to the free list.
    pub fn deallocate(&mut self, label: Label) -> Result<(), AllocatorError> {
        self.check_usable(label)?;
        if let Some(region) = self.table.remove(&label) {
            self.release_region(region);
        } else if !self.pending.remove(&label) {
            return Err(AllocatorError::UnknownLabel(label));
        }
        Ok(())
    }

    /// Retire every label in `labels`.
    pub fn deallocate_all(&mut self, labels: impl IntoIterator<Item = Label>) -> Result<(), AllocatorError> {
        for label in labels {
            self.deallocate(label)?;
        }
        Ok(())
    }

    /// Labels handed out but never given space.
    #[must_use]
    pub fn pending_labels(&self) -> Vec<Label> {
        self.pending.iter().copied().collect()
    }

    /// Labels that currently own a region.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.table.keys().copied()
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub const fn frontier(&self) -> u64 {
        self.frontier
    }

    #[must_use]
    pub const fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Total bytes sitting in reusable regions.
    #[must_use]
    pub fn free_bytes(&self) -> u64 {
        self.free_regions.iter().map(|r| r.size).sum()
    }

    fn check_usable(&self, label: Label) -> Result<(), AllocatorError> {
        if label == FILE_LABEL {
            return Err(AllocatorError::ReservedLabel);
        }
        if label < self.next_label && !self.is_live(label) {
            return Err(AllocatorError::InvalidAccess(label));
        }
        Ok(())
    }

    fn take_frontier(&mut self, size: u64) -> u64 {
        let offset = self.frontier;
        self.frontier += size;
        offset
    }

    /// First-fit from the free list.
    fn take_free(&mut self, size: u64) -> Option<u64> {
        let index = self.free_regions.iter().position(|r| r.size >= size)?;
        let region = &mut self.free_regions[index];
        let offset = region.offset;
        if region.size == size {
            self.free_regions.remove(index);
        } else {
            region.offset += size;
            region.size -= size;
        }
        Some(offset)
    }

    /// Return a region, coalescing neighbours and pulling the frontier
    /// back over a free tail.
    fn release_region(&mut self, region: Region) {
        if region.size == 0 {
            return;
        }
        let index = self
            .free_regions
            .partition_point(|r| r.offset < region.offset);
        self.free_regions.insert(index, region);

        if index + 1 < self.free_regions.len()
            && self.free_regions[index].end() == self.free_regions[index + 1].offset
        {
            let next = self.free_regions.remove(index + 1);
            self.free_regions[index].size += next.size;
        }
        if index > 0 && self.free_regions[index - 1].end() == self.free_regions[index].offset {
            let current = self.free_regions.remove(index);
            self.free_regions[index - 1].size += current.size;
        }

        if let Some(last) = self.free_regions.last().copied() {
            if last.end() == self.frontier {
                self.frontier = last.offset;
                self.free_regions.pop();
            }
        }
    }
}

impl ByteConverter for Region {
    const FIXED_SIZE: Option<usize> = Some(16);

    fn write_down(&self, out: &mut ObjectBytes) {
        self.offset.write_down(out);
        self.size.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        Ok(Self {
            offset: u64::read_out(reader)?,
            size: u64::read_out(reader)?,
        })
    }
}

/// Persisted form: data start, frontier, next label, the label table and
/// the free list. Pending labels are session state; deallocated labels
/// follow from `next_label` and the table.
impl ByteConverter for StorageAllocator {
    fn write_down(&self, out: &mut ObjectBytes) {
        self.data_start.write_down(out);
        self.frontier.write_down(out);
        self.next_label.write_down(out);
        let table: Vec<(Label, Region)> = self.table.iter().map(|(l, r)| (*l, *r)).collect();
        table.write_down(out);
        self.free_regions.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let data_start = u64::read_out(reader)?;
        let frontier = u64::read_out(reader)?;
        let next_label = Label::read_out(reader)?;
        let table: Vec<(Label, Region)> = Vec::read_out(reader)?;
        let free_regions: Vec<Region> = Vec::read_out(reader)?;
        Ok(Self {
            data_start,
            frontier,
            next_label,
            table: table.into_iter().collect(),
            pending: BTreeSet::new(),
            free_regions,
        })
    }
}
