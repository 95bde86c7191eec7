//! Ordered iteration over the engine
//!
//! A `StoreIterator` materializes the part of the keyspace it needs when
//! it is rewound or seeked, then walks that snapshot. Tombstones and
//! expired entries never show up.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::Result;
use crate::memtable::MemTableEntry;

use super::{Engine, Item};

/// Options controlling iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorOptions {
    /// Only keys starting with this prefix are valid (empty = all keys)
    pub prefix: Vec<u8>,
    /// Iterate in descending key order
    pub reverse: bool,
    /// Keep values in the snapshot; when false items carry empty values
    pub prefetch_values: bool,
    /// Advisory read-ahead size; snapshots are always read whole
    pub prefetch_size: usize,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            prefix: Vec::new(),
            reverse: false,
            prefetch_values: true,
            prefetch_size: 100,
        }
    }
}

/// Where a snapshot comes from
pub(super) enum SnapshotSource<'a> {
    /// Committed data only; collecting takes the engine write lock
    Read(&'a Engine),
    /// Committed data plus a pending batch; the write lock is already held
    Write(&'a Engine, &'a BTreeMap<Vec<u8>, MemTableEntry>),
}

/// Cursor over live items
///
/// Call `rewind` or `seek` before reading; until then the iterator is not
/// valid.
pub struct StoreIterator<'a> {
    source: SnapshotSource<'a>,
    options: IteratorOptions,
    now: u64,
    /// Snapshot in iteration order
    items: Vec<Item>,
    position: usize,
}

impl<'a> StoreIterator<'a> {
    pub(super) fn new(source: SnapshotSource<'a>, options: IteratorOptions, now: u64) -> Self {
        Self {
            source,
            options,
            now,
            items: Vec::new(),
            position: 0,
        }
    }

    /// Position at the first key (last under reverse) within the prefix
    pub fn rewind(&mut self) -> Result<()> {
        let upper = prefix_successor(&self.options.prefix);
        let lower = self.options.prefix.clone();
        self.load(Bound::Included(lower.as_slice()), bound_of(&upper))
    }

    /// Position at the first key >= `key` (last key <= `key` under reverse)
    pub fn seek(&mut self, key: &[u8]) -> Result<()> {
        if self.options.reverse {
            let lower = self.options.prefix.clone();
            self.load(Bound::Included(lower.as_slice()), Bound::Included(key))
        } else {
            let upper = prefix_successor(&self.options.prefix);
            self.load(Bound::Included(key), bound_of(&upper))
        }
    }

    /// Whether the iterator points at an item matching the prefix option
    pub fn valid(&self) -> bool {
        self.items
            .get(self.position)
            .is_some_and(|item| item.key.starts_with(&self.options.prefix))
    }

    /// Like `valid`, additionally requiring the key to start with `prefix`
    pub fn valid_for_prefix(&self, prefix: &[u8]) -> bool {
        self.valid() && self.items[self.position].key.starts_with(prefix)
    }

    /// Current item; `None` when not valid
    pub fn item(&self) -> Option<&Item> {
        if self.valid() {
            self.items.get(self.position)
        } else {
            None
        }
    }

    /// Advance to the next item in iteration order
    pub fn next(&mut self) {
        if self.position < self.items.len() {
            self.position += 1;
        }
    }

    /// Iteration options in effect
    pub fn options(&self) -> &IteratorOptions {
        &self.options
    }

    fn load(&mut self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<()> {
        let mut items = match self.source {
            SnapshotSource::Read(engine) => {
                let _write_guard = engine.write_lock.lock();
                engine.snapshot_range(lower, upper, None, self.now)?
            }
            SnapshotSource::Write(engine, pending) => {
                engine.snapshot_range(lower, upper, Some(pending), self.now)?
            }
        };

        if self.options.reverse {
            items.reverse();
        }
        if !self.options.prefetch_values {
            for item in &mut items {
                item.value = Vec::new();
            }
        }

        self.items = items;
        self.position = 0;
        Ok(())
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` when no such key exists (empty prefix or all `0xFF` bytes).
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

fn bound_of(key: &Option<Vec<u8>>) -> Bound<&[u8]> {
    match key {
        Some(key) => Bound::Excluded(key.as_slice()),
        None => Bound::Unbounded,
    }
}
