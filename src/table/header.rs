//! # File Headers
//!
//! Fixed 64-byte zerocopy headers at the front of every astrotab file.
//! The header is the only part of a file read before the declared encoding
//! is known, so its multi-byte fields are always little-endian via the
//! zerocopy wrapper types; the typed-stream body that follows uses the
//! encoding the header names.
//!
//! ## Layouts
//!
//! `table.meta` (table control block):
//!
//! ```text
//! Offset  Size  Description
//! 0       16    Magic: "AstroTab meta\0\0\0"
//! 16      4     Format version (u32)
//! 20      1     Encoding tag (0 = canonical, 1 = native)
//! 21      3     Padding
//! 24      8     Row count (u64)
//! 32      4     Data manager count (u32)
//! 36      4     Column count (u32)
//! 40      24    Reserved
//! ```
//!
//! `dm<seqnr>.dat` (standard-manager data file):
//!
//! ```text
//! Offset  Size  Description
//! 0       16    Magic: "AstroTab data\0\0\0"
//! 16      4     Format version (u32)
//! 20      1     Encoding tag
//! 21      3     Padding
//! 24      8     Row count (u64)
//! 32      4     Column count (u32)
//! 36      28    Reserved
//! ```
//!
//! Readers validate magic and version before trusting anything else;
//! unknown versions are rejected rather than misread.

use crate::stream::Encoding;
use eyre::{ensure, Result};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const META_MAGIC: &[u8; 16] = b"AstroTab meta\0\0\0";
pub const DATA_MAGIC: &[u8; 16] = b"AstroTab data\0\0\0";

pub const CURRENT_VERSION: u32 = 1;
pub const FILE_HEADER_SIZE: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MetaFileHeader {
    magic: [u8; 16],
    version: U32,
    encoding: u8,
    pad: [u8; 3],
    row_count: U64,
    manager_count: U32,
    column_count: U32,
    reserved: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<MetaFileHeader>() == FILE_HEADER_SIZE);

impl MetaFileHeader {
    pub fn new(encoding: Encoding, row_count: u64, manager_count: u32, column_count: u32) -> Self {
        MetaFileHeader {
            magic: *META_MAGIC,
            version: U32::new(CURRENT_VERSION),
            encoding: encoding as u8,
            pad: [0; 3],
            row_count: U64::new(row_count),
            manager_count: U32::new(manager_count),
            column_count: U32::new(column_count),
            reserved: [0; 24],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "file too small for a table control header: {} bytes",
            bytes.len()
        );
        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("malformed table control header: {}", e))?;
        ensure!(
            &header.magic == META_MAGIC,
            "not a table control file (bad magic)"
        );
        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported table format version: {}",
            header.version.get()
        );
        Ok(header)
    }

    pub fn encoding(&self) -> Result<Encoding> {
        Encoding::try_from(self.encoding)
    }

    pub fn row_count(&self) -> u64 {
        self.row_count.get()
    }

    pub fn manager_count(&self) -> u32 {
        self.manager_count.get()
    }

    pub fn column_count(&self) -> u32 {
        self.column_count.get()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct DataFileHeader {
    magic: [u8; 16],
    version: U32,
    encoding: u8,
    pad: [u8; 3],
    row_count: U64,
    column_count: U32,
    reserved: [u8; 28],
}

const _: () = assert!(std::mem::size_of::<DataFileHeader>() == FILE_HEADER_SIZE);

impl DataFileHeader {
    pub fn new(encoding: Encoding, row_count: u64, column_count: u32) -> Self {
        DataFileHeader {
            magic: *DATA_MAGIC,
            version: U32::new(CURRENT_VERSION),
            encoding: encoding as u8,
            pad: [0; 3],
            row_count: U64::new(row_count),
            column_count: U32::new(column_count),
            reserved: [0; 28],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "file too small for a data file header: {} bytes",
            bytes.len()
        );
        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("malformed data file header: {}", e))?;
        ensure!(
            &header.magic == DATA_MAGIC,
            "not a storage manager data file (bad magic)"
        );
        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported data file format version: {}",
            header.version.get()
        );
        Ok(header)
    }

    pub fn encoding(&self) -> Result<Encoding> {
        Encoding::try_from(self.encoding)
    }

    pub fn row_count(&self) -> u64 {
        self.row_count.get()
    }

    pub fn column_count(&self) -> u32 {
        self.column_count.get()
    }
}
