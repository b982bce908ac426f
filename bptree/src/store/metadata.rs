//! Metadata region at the start of a store file.
//!
//! # Layout
//!
//! The region has a fixed budget chosen when the file is created:
//!
//! ```text
//! 0   magic            8 bytes  "BPTREEDB"
//! 8   format version   4 bytes
//! 12  metadata size    8 bytes  (budget of the whole region)
//! 20  root label       8 bytes  (0 = no root)
//! 28  body length      8 bytes
//! 36  body checksum    4 bytes  (CRC-32)
//! 40  body             allocator table, then relation tree
//! ```
//!
//! Objects are stored after the region, starting at `metadata size`.

// Offsets are compile-time constants well within usize.
#![allow(clippy::cast_possible_truncation)]

use super::allocator::{FILE_LABEL, Label, StorageAllocator};
use super::bytes::{ByteConverter, ByteReader, ConvertError, ObjectBytes};
use super::relation::ObjectRelationTree;

/// Magic number identifying a store file: "BPTREEDB"
pub const MAGIC: [u8; 8] = *b"BPTREEDB";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header in front of the body.
pub const HEADER_SIZE: usize = 40;

/// Header field offsets.
mod offsets {
    pub const MAGIC: usize = 0;
    pub const FORMAT_VERSION: usize = 8;
    pub const METADATA_SIZE: usize = 12;
    pub const ROOT_LABEL: usize = 20;
    pub const BODY_LEN: usize = 28;
    pub const CHECKSUM: usize = 36;
}

/// Errors that can occur while reading or writing the metadata region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The file does not start with `MAGIC`.
    InvalidMagic([u8; 8]),
    /// Written by a format version this build does not read.
    UnsupportedVersion(u32),
    /// Body bytes do not match the stored checksum.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Encoded metadata does not fit its reserved budget.
    CorruptLayout { needed: u64, budget: u64 },
    /// Body bytes failed to decode.
    Convert(ConvertError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagic(magic) => write!(f, "invalid magic number: {magic:?}"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "metadata checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
            Self::CorruptLayout { needed, budget } => write!(
                f,
                "metadata needs {needed} bytes but only {budget} are reserved"
            ),
            Self::Convert(e) => write!(f, "metadata decode error: {e}"),
        }
    }
}

impl std::error::Error for MetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Convert(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConvertError> for MetadataError {
    fn from(e: ConvertError) -> Self {
        Self::Convert(e)
    }
}

/// Parsed fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub metadata_size: u64,
    pub root: Option<Label>,
    pub body_len: u64,
    pub checksum: u32,
}

impl Header {
    /// Parse and validate the fixed header.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self, MetadataError> {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[offsets::MAGIC..offsets::MAGIC + 8]);
        if magic != MAGIC {
            return Err(MetadataError::InvalidMagic(magic));
        }

        let version = read_u32(bytes, offsets::FORMAT_VERSION);
        if version != FORMAT_VERSION {
            return Err(MetadataError::UnsupportedVersion(version));
        }

        let metadata_size = read_u64(bytes, offsets::METADATA_SIZE);
        let body_len = read_u64(bytes, offsets::BODY_LEN);
        let needed = HEADER_SIZE as u64 + body_len;
        if needed > metadata_size {
            return Err(MetadataError::CorruptLayout {
                needed,
                budget: metadata_size,
            });
        }

        let root = match read_u64(bytes, offsets::ROOT_LABEL) {
            FILE_LABEL => None,
            label => Some(label),
        };

        Ok(Self {
            metadata_size,
            root,
            body_len,
            checksum: read_u32(bytes, offsets::CHECKSUM),
        })
    }
}

/// Everything persisted in the metadata region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub metadata_size: u64,
    pub root: Option<Label>,
    pub allocator: StorageAllocator,
    pub relations: ObjectRelationTree,
}

impl Metadata {
    /// Fresh metadata for an empty file.
    #[must_use]
    pub fn new(metadata_size: u64) -> Self {
        Self {
            metadata_size,
            root: None,
            allocator: StorageAllocator::new(metadata_size),
            relations: ObjectRelationTree::new(),
        }
    }

    /// Encode header and body.
    ///
    /// Fails with `CorruptLayout` instead of truncating when the encoding
    /// exceeds the budget.
    pub fn encode(&self) -> Result<Vec<u8>, MetadataError> {
        let mut body = ObjectBytes::new();
        self.allocator.write_down(&mut body);
        self.relations.write_down(&mut body);
        let body = body.as_slice();

        let needed = (HEADER_SIZE + body.len()) as u64;
        if needed > self.metadata_size {
            return Err(MetadataError::CorruptLayout {
                needed,
                budget: self.metadata_size,
            });
        }

        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[offsets::MAGIC..offsets::MAGIC + 8].copy_from_slice(&MAGIC);
        bytes[offsets::FORMAT_VERSION..offsets::FORMAT_VERSION + 4]
            .copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes[offsets::METADATA_SIZE..offsets::METADATA_SIZE + 8]
            .copy_from_slice(&self.metadata_size.to_le_bytes());
        bytes[offsets::ROOT_LABEL..offsets::ROOT_LABEL + 8]
            .copy_from_slice(&self.root.unwrap_or(FILE_LABEL).to_le_bytes());
        bytes[offsets::BODY_LEN..offsets::BODY_LEN + 8]
            .copy_from_slice(&(body.len() as u64).to_le_bytes());
        bytes[offsets::CHECKSUM..offsets::CHECKSUM + 4]
            .copy_from_slice(&crc32fast::hash(body).to_le_bytes());
        bytes.extend_from_slice(body);
        Ok(bytes)
    }

    /// Decode the body that follows an already parsed header.
    pub fn decode(header: &Header, body: &[u8]) -> Result<Self, MetadataError> {
        let actual = crc32fast::hash(body);
        if actual != header.checksum {
            return Err(MetadataError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let mut reader = ByteReader::new(body);
        let allocator = StorageAllocator::read_out(&mut reader)?;
        let relations = ObjectRelationTree::read_out(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(ConvertError::TrailingBytes(reader.remaining()).into());
        }

        Ok(Self {
            metadata_size: header.metadata_size,
            root: header.root,
            allocator,
            relations,
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}
