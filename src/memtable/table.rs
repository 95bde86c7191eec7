//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::MemTableEntry;

/// In-memory table for recent writes
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, MemTableEntry>>,

    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (read lock)
    ///
    /// `None` means the MemTable knows nothing about the key; a tombstone is
    /// returned as `Some(MemTableEntry::Tombstone)`.
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.data.read().get(key).cloned()
    }

    /// Put a persistent key-value pair, returning the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::persistent(value))
    }

    /// Put a value with an absolute expiry (0 = never)
    pub fn put_entry(&self, key: Vec<u8>, value: Vec<u8>, expires_at: u64) -> usize {
        self.insert(key, MemTableEntry::Value { value, expires_at })
    }

    /// Delete a key (inserts tombstone)
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    /// Apply a batch of entries under a single write lock
    pub fn apply_batch(&self, batch: Vec<(Vec<u8>, MemTableEntry)>) -> usize {
        let mut data = self.data.write();
        for (key, entry) in batch {
            self.insert_locked(&mut data, key, entry);
        }
        self.size.load(Ordering::SeqCst)
    }

    /// Entries with keys inside the given bounds, in key order
    pub fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Vec<(Vec<u8>, MemTableEntry)> {
        if crate::storage::is_empty_range(lower, upper) {
            return Vec::new();
        }
        let data = self.data.read();
        data.range::<[u8], _>((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the MemTable holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Get an iterator over a snapshot of all entries, in sorted key order
    pub fn iter(&self) -> MemTableIterator {
        let snapshot: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        MemTableIterator {
            inner: snapshot.into_iter(),
        }
    }

    /// Count tombstones and values already expired at `now`
    pub fn dead_count(&self, now: u64) -> usize {
        self.data
            .read()
            .values()
            .filter(|entry| !entry.is_live(now))
            .count()
    }

    /// Drop tombstones and expired values, returning how many were removed.
    ///
    /// Only sound when no older table sits below this one, since a dropped
    /// tombstone would otherwise uncover the value it deleted.
    pub fn purge_dead(&self, now: u64) -> usize {
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));

        let size = data
            .iter()
            .map(|(key, entry)| key.len() + entry.footprint())
            .sum();
        self.size.store(size, Ordering::SeqCst);

        before - data.len()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::SeqCst);
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let mut data = self.data.write();
        self.insert_locked(&mut data, key, entry);
        self.size.load(Ordering::SeqCst)
    }

    fn insert_locked(
        &self,
        data: &mut BTreeMap<Vec<u8>, MemTableEntry>,
        key: Vec<u8>,
        entry: MemTableEntry,
    ) {
        let key_len = key.len();
        let added = entry.footprint();
        match data.insert(key, entry) {
            // Key bytes were already counted
            Some(old) => {
                self.size.fetch_add(added, Ordering::SeqCst);
                self.size.fetch_sub(old.footprint(), Ordering::SeqCst);
            }
            None => {
                self.size.fetch_add(key_len + added, Ordering::SeqCst);
            }
        }
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a MemTable snapshot
pub struct MemTableIterator {
    inner: std::vec::IntoIter<(Vec<u8>, MemTableEntry)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
