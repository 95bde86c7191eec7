//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::Result;
use crate::memtable::MemTableEntry;

use super::{ENTRY_HEADER_SIZE, HEADER_SIZE, TOMBSTONE_MARKER};

/// Iterator over SSTable entries in sorted key order
pub struct SSTableIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    /// Set after an I/O error so iteration ends
    failed: bool,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator starting from the data block
    pub(super) fn new(file: &'a mut BufReader<File>, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: HEADER_SIZE,
            failed: false,
        })
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    type Item = Result<(Vec<u8>, MemTableEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop at index block
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        match read_entry(self.file) {
            Ok((key, entry, size)) => {
                self.current_offset += size;
                Some(Ok((key, entry)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read one entry at the current file position.
///
/// Returns the key, the entry, and the number of bytes consumed.
pub(super) fn read_entry<R: Read>(file: &mut R) -> Result<(Vec<u8>, MemTableEntry, u64)> {
    let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
    file.read_exact(&mut header)?;

    let mut word = [0u8; 4];
    word.copy_from_slice(&header[0..4]);
    let key_len = u32::from_le_bytes(word) as usize;
    word.copy_from_slice(&header[4..8]);
    let val_len = u32::from_le_bytes(word);
    let mut long = [0u8; 8];
    long.copy_from_slice(&header[8..16]);
    let expires_at = u64::from_le_bytes(long);

    let mut key = vec![0u8; key_len];
    file.read_exact(&mut key)?;

    let mut size = ENTRY_HEADER_SIZE + key_len as u64;

    let entry = if val_len == TOMBSTONE_MARKER {
        MemTableEntry::Tombstone
    } else {
        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;
        size += val_len as u64;
        MemTableEntry::Value { value, expires_at }
    };

    Ok((key, entry, size))
}
