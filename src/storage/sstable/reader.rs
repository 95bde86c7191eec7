//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use crate::error::{Result, TallyError};
use crate::memtable::MemTableEntry;

use super::iterator::{read_entry, SSTableIterator};
use super::{FLAG_BASE, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    /// Location on disk (needed to delete the file after compaction)
    path: PathBuf,
    /// File handle for reading entries
    file: BufReader<File>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    /// Metadata
    entry_count: u64,
    flags: u16,
    file_size: u64,
    /// Index block starting offset (for iteration)
    index_offset: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Loads the entire index into memory for fast lookups.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(TallyError::Storage(format!(
                "SSTable {} too small: {} bytes",
                path.display(),
                file_size
            )));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(TallyError::Storage(format!(
                "Invalid SSTable magic: expected TLKV, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(TallyError::Storage(format!(
                "Unsupported SSTable version: {}",
                version
            )));
        }

        let flags = u16::from_le_bytes([header[6], header[7]]);
        let mut count = [0u8; 8];
        count.copy_from_slice(&header[8..16]);
        let entry_count = u64::from_le_bytes(count);

        // Read footer to get index offset
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let mut offset = [0u8; 8];
        offset.copy_from_slice(&footer[0..8]);
        let index_offset = u64::from_le_bytes(offset);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(TallyError::Storage(format!(
                "SSTable {} has a bad index offset {}",
                path.display(),
                index_offset
            )));
        }

        // Load index into memory
        file.seek(SeekFrom::Start(index_offset))?;
        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.read_exact(&mut index_data)?;

        let index = parse_index(&index_data)?;

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            flags,
            file_size,
            index_offset,
        })
    }

    /// Get the entry for a key — O(log n) lookup via in-memory index
    ///
    /// Returns:
    /// - `Ok(entry)` — key found (value or tombstone)
    /// - `Err(KeyNotFound)` — key not in this SSTable
    pub fn get(&mut self, key: &[u8]) -> Result<MemTableEntry> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Err(TallyError::KeyNotFound),
        };

        self.file.seek(SeekFrom::Start(offset))?;
        let (_, entry, _) = read_entry(&mut self.file)?;
        Ok(entry)
    }

    /// Entries whose keys fall inside the bounds, in key order
    pub fn range(
        &mut self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, MemTableEntry)>> {
        if crate::storage::is_empty_range(lower, upper) {
            return Ok(Vec::new());
        }

        let offsets: Vec<u64> = self
            .index
            .range::<[u8], _>((lower, upper))
            .map(|(_, &offset)| offset)
            .collect();

        let mut entries = Vec::with_capacity(offsets.len());
        if let Some(&first) = offsets.first() {
            // Entries are contiguous in key order, one seek is enough
            self.file.seek(SeekFrom::Start(first))?;
            for _ in 0..offsets.len() {
                let (key, entry, _) = read_entry(&mut self.file)?;
                entries.push((key, entry));
            }
        }
        Ok(entries)
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Header flags
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Whether this table supersedes all older tables
    pub fn is_base(&self) -> bool {
        self.flags & FLAG_BASE != 0
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the backing file in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false, // Empty SSTable
        }
    }

    /// Create an iterator over all entries (for compaction, debugging)
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.index_offset)
    }
}

/// Parse index entries: [key_len(4)][offset(8)][key]
fn parse_index(data: &[u8]) -> Result<BTreeMap<Vec<u8>, u64>> {
    let truncated = || TallyError::Storage("SSTable index block is truncated".to_string());

    let mut index = BTreeMap::new();
    let mut pos = 0;
    while pos < data.len() {
        let len_bytes = data.get(pos..pos + 4).ok_or_else(truncated)?;
        let key_len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        pos += 4;

        let offset_bytes = data.get(pos..pos + 8).ok_or_else(truncated)?;
        let mut offset = [0u8; 8];
        offset.copy_from_slice(offset_bytes);
        pos += 8;

        let key = data.get(pos..pos + key_len).ok_or_else(truncated)?;
        pos += key_len;

        index.insert(key.to_vec(), u64::from_le_bytes(offset));
    }
    Ok(index)
}
