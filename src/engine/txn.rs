//! Read and write transactions

use std::collections::BTreeMap;

use crate::error::Result;
use crate::memtable::MemTableEntry;

use super::iterator::{IteratorOptions, SnapshotSource, StoreIterator};
use super::{live_item, Engine, Entry, Item};

/// Read-only view of the engine at a fixed clock reading
pub struct ReadTxn<'a> {
    engine: &'a Engine,
    now: u64,
}

impl<'a> ReadTxn<'a> {
    pub(super) fn new(engine: &'a Engine, now: u64) -> Self {
        Self { engine, now }
    }

    /// Live item for a key; `None` when absent, deleted or expired
    pub fn get(&self, key: &[u8]) -> Result<Option<Item>> {
        Ok(self
            .engine
            .lookup(key)?
            .and_then(|entry| live_item(key.to_vec(), entry, self.now)))
    }

    /// Ordered iterator; nothing is read until `rewind` or `seek`
    pub fn iter(&self, options: IteratorOptions) -> StoreIterator<'_> {
        StoreIterator::new(SnapshotSource::Read(self.engine), options, self.now)
    }

    /// Clock reading used to decide expiry
    pub fn now(&self) -> u64 {
        self.now
    }
}

/// Read-write transaction; runs while holding the engine write lock
pub struct WriteTxn<'a> {
    engine: &'a Engine,
    now: u64,
    pending: BTreeMap<Vec<u8>, MemTableEntry>,
}

impl<'a> WriteTxn<'a> {
    pub(super) fn new(engine: &'a Engine, now: u64) -> Self {
        Self {
            engine,
            now,
            pending: BTreeMap::new(),
        }
    }

    /// Live item for a key, seeing this transaction's own writes
    pub fn get(&self, key: &[u8]) -> Result<Option<Item>> {
        let entry = match self.pending.get(key) {
            Some(entry) => Some(entry.clone()),
            None => self.engine.lookup(key)?,
        };
        Ok(entry.and_then(|entry| live_item(key.to_vec(), entry, self.now)))
    }

    /// Stage a write
    pub fn set_entry(&mut self, entry: Entry) {
        self.pending.insert(
            entry.key,
            MemTableEntry::Value {
                value: entry.value,
                expires_at: entry.expires_at,
            },
        );
    }

    /// Stage a persistent write
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.set_entry(Entry::new(key, value));
    }

    /// Stage a delete
    pub fn delete(&mut self, key: &[u8]) {
        self.pending.insert(key.to_vec(), MemTableEntry::Tombstone);
    }

    /// Ordered iterator over committed data plus this transaction's writes
    pub fn iter(&self, options: IteratorOptions) -> StoreIterator<'_> {
        StoreIterator::new(
            SnapshotSource::Write(self.engine, &self.pending),
            options,
            self.now,
        )
    }

    /// Clock reading used to decide expiry
    pub fn now(&self) -> u64 {
        self.now
    }

    pub(super) fn into_pending(self) -> BTreeMap<Vec<u8>, MemTableEntry> {
        self.pending
    }
}
