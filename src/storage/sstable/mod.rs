//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                                │
//! │   Magic: "TLKV" (4) | Version: u16 | Flags: u16 | Count: u64     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                            │
//! │   [KeyLen: u32][ValLen: u32][ExpiresAt: u64][Key][Value]         │
//! │   ... repeated for each entry ...                                │
//! │   (ValLen = u32::MAX means tombstone, no value bytes)            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                           │
//! │   [KeyLen: u32][Offset: u64][Key]                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                                │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | Padding (4)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A table written by compaction carries [`FLAG_BASE`]: it replaces every
//! table with a smaller id, so those are deleted on open.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying a TallyKV SSTable file
pub(crate) const MAGIC: &[u8; 4] = b"TLKV";

/// Current SSTable format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Flags (2) + EntryCount (8)
pub(crate) const HEADER_SIZE: u64 = 16;

/// Footer size: IndexOffset (8) + DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Per-entry header: KeyLen (4) + ValLen (4) + ExpiresAt (8)
pub(crate) const ENTRY_HEADER_SIZE: u64 = 16;

/// Sentinel value indicating a tombstone (deleted key)
pub(crate) const TOMBSTONE_MARKER: u32 = u32::MAX;

/// Header flag: table produced by compaction, supersedes older tables
pub const FLAG_BASE: u16 = 0x0001;

// =============================================================================
// SSTable Metadata
// =============================================================================

/// Metadata returned when a table has been written
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable
    pub entry_count: u64,
    /// Smallest key (for range filtering)
    pub min_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
    /// Header flags
    pub flags: u16,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false if key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
