//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Compact all SSTables into one when enough of them is garbage

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, TallyError};
use crate::expiration;
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableReader, FLAG_BASE};

/// Outcome of a successful compaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReclaimStats {
    /// Tables before the rewrite
    pub tables_before: usize,
    /// Tables after the rewrite (0 or 1)
    pub tables_after: usize,
    /// Entries across all tables before the rewrite
    pub entries_before: u64,
    /// Live entries written to the new table
    pub entries_after: u64,
    /// Fraction of entries that were discardable
    pub discard_ratio: f64,
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - All methods use `&self` (no exclusive access needed)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables (atomic, lock-free)
    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    /// 5. Drop tables superseded by the newest compacted (base) table
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        // Sort newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut sstables = Vec::new();
        for id in &sstable_ids {
            let reader = SSTableReader::open(&Self::sstable_path_with_dir(path, *id))?;
            let is_base = reader.is_base();
            sstables.push(reader);
            if is_base {
                break;
            }
        }

        // Anything older than the base table was merged into it
        for id in sstable_ids.iter().skip(sstables.len()) {
            let stale = Self::sstable_path_with_dir(path, *id);
            tracing::info!(path = %stale.display(), "removing SSTable superseded by compaction");
            fs::remove_file(stale)?;
        }

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get the newest version of a key (searches SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(entry))` — newest version found (may be a tombstone)
    /// - `Ok(None)` — no SSTable knows the key
    ///
    /// Note: Uses write lock because SSTableReader::get() needs &mut self
    /// for file seeking.
    pub fn get(&self, key: &[u8]) -> Result<Option<MemTableEntry>> {
        let mut sstables = self.sstables.write();

        for reader in sstables.iter_mut() {
            // Skip SSTable if key is outside its range (O(1) check)
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(entry) => return Ok(Some(entry)),
                Err(TallyError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Newest version of every key inside the bounds, merged across tables
    pub fn collect_range(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Result<BTreeMap<Vec<u8>, MemTableEntry>> {
        let mut sstables = self.sstables.write();
        let mut merged = BTreeMap::new();

        // Oldest first so newer versions overwrite older ones
        for reader in sstables.iter_mut().rev() {
            for (key, entry) in reader.range(lower, upper)? {
                merged.insert(key, entry);
            }
        }

        Ok(merged)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Creates a new SSTable file from the MemTable's sorted entries,
    /// opens a reader for it, and adds it to the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(TallyError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        // Entries are already sorted (BTreeMap)
        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value { value, expires_at } => builder.add(&key, &value, expires_at)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        tracing::debug!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "flushed MemTable to SSTable"
        );

        Ok(metadata)
    }

    /// Fraction of SSTable entries that compaction would drop as of `now`
    ///
    /// 0.0 when there are no SSTables.
    pub fn garbage_ratio(&self, now: u64) -> Result<f64> {
        let mut sstables = self.sstables.write();
        let (total, live) = Self::live_entries(&mut sstables, now)?;
        if total == 0 {
            return Ok(0.0);
        }
        Ok((total - live.len() as u64) as f64 / total as f64)
    }

    /// Rewrite all SSTables into a single base table when at least `ratio`
    /// of their entries are discardable (tombstones, shadowed versions,
    /// entries expired as of `now`).
    ///
    /// Returns `NoRewrite` when there is nothing, or not enough, to reclaim.
    /// Callers must make sure no flush runs concurrently.
    pub fn compact(&self, ratio: f64, now: u64) -> Result<ReclaimStats> {
        let mut sstables = self.sstables.write();

        let tables_before = sstables.len();
        let (entries_before, live) = Self::live_entries(&mut sstables, now)?;
        if entries_before == 0 {
            return Err(TallyError::NoRewrite);
        }

        let entries_after = live.len() as u64;
        let discard_ratio = (entries_before - entries_after) as f64 / entries_before as f64;
        if entries_after == entries_before || discard_ratio < ratio {
            return Err(TallyError::NoRewrite);
        }

        let mut replacement = Vec::new();
        if !live.is_empty() {
            let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
            let path = self.sstable_path(id);
            let mut builder = SSTableBuilder::with_flags(&path, FLAG_BASE)?;
            for (key, value, expires_at) in &live {
                builder.add(key, value, *expires_at)?;
            }
            builder.finish()?;
            replacement.push(SSTableReader::open(&path)?);
        }

        // Oldest first: a crash part-way leaves only the newest tables,
        // which still shadow everything that was removed.
        let old = std::mem::replace(&mut *sstables, replacement);
        for reader in old.iter().rev() {
            fs::remove_file(reader.path())?;
        }

        tracing::info!(
            tables_before,
            entries_before,
            entries_after,
            discard_ratio,
            "compacted SSTables"
        );

        Ok(ReclaimStats {
            tables_before,
            tables_after: sstables.len(),
            entries_before,
            entries_after,
            discard_ratio,
        })
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Total entries across all SSTables (tombstones and old versions included)
    pub fn total_entries(&self) -> u64 {
        self.sstables.read().iter().map(|r| r.entry_count()).sum()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Total entry count plus the newest live version of every key
    fn live_entries(
        sstables: &mut [SSTableReader],
        now: u64,
    ) -> Result<(u64, Vec<(Vec<u8>, Vec<u8>, u64)>)> {
        let total: u64 = sstables.iter().map(|r| r.entry_count()).sum();

        let mut merged: BTreeMap<Vec<u8>, MemTableEntry> = BTreeMap::new();
        for reader in sstables.iter_mut().rev() {
            for item in reader.iter()? {
                let (key, entry) = item?;
                merged.insert(key, entry);
            }
        }

        let live = merged
            .into_iter()
            .filter_map(|(key, entry)| match entry {
                MemTableEntry::Value { value, expires_at }
                    if !expiration::is_expired(expires_at, now) =>
                {
                    Some((key, value, expires_at))
                }
                _ => None,
            })
            .collect();

        Ok((total, live))
    }

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    /// Generate SSTable path given a directory and ID
    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
