//! Engine Module
//!
//! The transactional store that everything above it runs against.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Read (`view`) and read-modify-write (`update`) transactions
//! - Ordered iteration with seek / prefix / reverse
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup
//! - Reclaim space held by dead entries

mod iterator;
mod txn;

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::{Config, EngineKind};
use crate::error::{Result, TallyError};
use crate::expiration;
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{ReclaimStats, StorageManager};
use crate::wal::{Operation, WalRecovery, WalWriter};

pub use iterator::{IteratorOptions, StoreIterator};
pub use txn::{ReadTxn, WriteTxn};

/// A value to be written, with optional absolute expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Unix seconds, 0 = never
    pub expires_at: u64,
}

impl Entry {
    /// A persistent entry
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at: expiration::NO_EXPIRY,
        }
    }

    /// Expire `lease_secs` seconds from now
    pub fn with_ttl(self, lease_secs: i64) -> Self {
        let at = expiration::expires_at(expiration::now_unix(), lease_secs);
        self.with_expires_at(at)
    }

    /// Expire at an absolute unix time (0 = never)
    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = expires_at;
        self
    }
}

/// A live key as seen by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub expires_at: u64,
}

impl Item {
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Absolute expiry in unix seconds, 0 when the item never expires
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (update/flush/reclaim): Serialized by `write_lock`
///   - Only ONE write transaction at a time, which makes read-modify-write
///     sequences linearizable
///   - Commit order: write_lock → WAL → memtable → storage (on flush)
///
/// - **Point reads** (view + get): No write_lock needed
///   - MemTable uses internal RwLock (many concurrent readers)
///   - A committed batch lands in the MemTable under one write lock, so
///     readers see all of it or none of it
///   - StorageManager uses its write lock for SSTable reads
///     (SSTableReader needs &mut self for file seeking)
///
/// - **Iterator snapshots** take `write_lock` while they collect, so a
///   flush or compaction can't move entries between the two layers mid-read
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory where SSTables are stored (file engine only)
    storage_dir: Option<PathBuf>,

    /// Write-ahead log for durability (file engine only)
    wal: Option<Mutex<WalWriter>>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (file engine only)
    storage: Option<StorageManager>,

    /// Serializes write transactions, flushes and compaction
    write_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine with the given config
    ///
    /// For the file engine, on startup:
    /// 1. Open/create data directory
    /// 2. Load existing SSTables
    /// 3. Replay the WAL and flush what it held
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        match config.engine {
            EngineKind::Memory => {
                tracing::info!("opening in-memory engine");
                Ok(Self {
                    config,
                    storage_dir: None,
                    wal: None,
                    memtable: MemTable::new(),
                    storage: None,
                    write_lock: Mutex::new(()),
                })
            }
            EngineKind::File => Self::open_file(config),
        }
    }

    /// Open a file engine rooted at `path` with default settings
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open an engine that keeps everything in memory
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Config::builder().engine(EngineKind::Memory).build())
    }

    fn open_file(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        let mut recovered = false;
        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery finished"
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put {
                        key,
                        value,
                        expires_at,
                    } => {
                        memtable.put_entry(key, value, expires_at);
                    }
                    Operation::Delete { key } => {
                        memtable.delete(key);
                    }
                }
            }

            // Make recovered data durable in an SSTable before the WAL is reused
            if !memtable.is_empty() {
                tracing::info!(
                    entries = memtable.entry_count(),
                    "flushing recovered entries to SSTable"
                );
                storage.flush(&memtable)?;
                memtable.clear();
                recovered = true;
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        if recovered {
            wal.truncate()?;
        }

        tracing::info!(
            path = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            "opened file engine"
        );

        Ok(Self {
            config,
            storage_dir: Some(storage_dir),
            wal: Some(Mutex::new(wal)),
            memtable,
            storage: Some(storage),
            write_lock: Mutex::new(()),
        })
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        let txn = ReadTxn::new(self, expiration::now_unix());
        f(&txn)
    }

    /// Run a read-write transaction
    ///
    /// Write transactions run one at a time. When `f` returns `Ok` its
    /// pending writes are logged and applied as one batch; on `Err`
    /// nothing is written.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let _write_guard = self.write_lock.lock();

        let mut txn = WriteTxn::new(self, expiration::now_unix());
        let result = f(&mut txn)?;
        self.commit(txn.into_pending())?;

        Ok(result)
    }

    /// Log and apply a committed batch (called with write lock held)
    fn commit(&self, pending: BTreeMap<Vec<u8>, MemTableEntry>) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        // Step 1: WAL first (durability guarantee)
        if let Some(wal) = &self.wal {
            let operations = pending
                .iter()
                .map(|(key, entry)| match entry {
                    MemTableEntry::Value { value, expires_at } => Operation::Put {
                        key: key.clone(),
                        value: value.clone(),
                        expires_at: *expires_at,
                    },
                    MemTableEntry::Tombstone => Operation::Delete { key: key.clone() },
                })
                .collect();
            wal.lock().append_batch(operations)?;
        }

        // Step 2: MemTable, as one visible step
        let new_size = self.memtable.apply_batch(pending.into_iter().collect());

        // Step 3: Flush if the MemTable grew too large. The batch is already
        // logged and visible, so a failed flush must not fail the commit;
        // the MemTable stays full and the next commit or close retries.
        if self.storage.is_some() && new_size >= self.config.memtable_size_limit {
            if let Err(e) = self.flush_internal() {
                tracing::warn!(error = %e, memtable_size = new_size, "auto-flush failed");
            }
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Newest stored version of a key, expired values and tombstones included
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    fn lookup(&self, key: &[u8]) -> Result<Option<MemTableEntry>> {
        if let Some(entry) = self.memtable.get(key) {
            return Ok(Some(entry));
        }
        match &self.storage {
            Some(storage) => storage.get(key),
            None => Ok(None),
        }
    }

    /// Live items inside the bounds, in key order, with `overlay` (a write
    /// transaction's pending batch) applied on top
    fn snapshot_range(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        overlay: Option<&BTreeMap<Vec<u8>, MemTableEntry>>,
        now: u64,
    ) -> Result<Vec<Item>> {
        let mut merged = match &self.storage {
            Some(storage) => storage.collect_range(lower, upper)?,
            None => BTreeMap::new(),
        };

        for (key, entry) in self.memtable.range(lower, upper) {
            merged.insert(key, entry);
        }

        if let Some(pending) = overlay {
            if !crate::storage::is_empty_range(lower, upper) {
                for (key, entry) in pending.range::<[u8], _>((lower, upper)) {
                    merged.insert(key.clone(), entry.clone());
                }
            }
        }

        Ok(merged
            .into_iter()
            .filter_map(|(key, entry)| live_item(key, entry, now))
            .collect())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size. No-op for the memory engine.
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        let storage = match &self.storage {
            Some(storage) => storage,
            None => return Ok(()),
        };

        if self.memtable.is_empty() {
            return Ok(());
        }

        // Step 1: Flush memtable to SSTable (StorageManager internally locks)
        storage.flush(&self.memtable)?;

        // Step 2: Clear memtable
        self.memtable.clear();

        // Step 3: Truncate WAL (entries are now durable in SSTable)
        if let Some(wal) = &self.wal {
            wal.lock().truncate()?;
        }

        Ok(())
    }

    /// Drop dead entries when at least `ratio` of stored entries are dead.
    ///
    /// Dead means deleted, superseded by a newer version, or expired.
    /// Returns `NoRewrite` when the threshold is not reached.
    pub fn reclaim(&self, ratio: f64) -> Result<ReclaimStats> {
        let _write_guard = self.write_lock.lock();
        let now = expiration::now_unix();

        match &self.storage {
            Some(storage) => storage.compact(ratio, now),
            None => {
                let entries_before = self.memtable.entry_count() as u64;
                let dead = self.memtable.dead_count(now) as u64;
                if entries_before == 0 || dead == 0 {
                    return Err(TallyError::NoRewrite);
                }
                let discard_ratio = dead as f64 / entries_before as f64;
                if discard_ratio < ratio {
                    return Err(TallyError::NoRewrite);
                }
                let removed = self.memtable.purge_dead(now) as u64;
                Ok(ReclaimStats {
                    tables_before: 0,
                    tables_after: 0,
                    entries_before,
                    entries_after: entries_before - removed,
                    discard_ratio,
                })
            }
        }
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs the WAL to disk
    pub fn close(&self) -> Result<()> {
        self.flush()?;

        if let Some(wal) = &self.wal {
            wal.lock().sync()?;
        }

        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the storage directory path (file engine only)
    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Get the number of SSTables (0 for the memory engine)
    pub fn sstable_count(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.sstable_count())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Turn a stored version into a visible item, hiding tombstones and expired values
fn live_item(key: Vec<u8>, entry: MemTableEntry, now: u64) -> Option<Item> {
    match entry {
        MemTableEntry::Value { value, expires_at } if !expiration::is_expired(expires_at, now) => {
            Some(Item {
                key,
                value,
                expires_at,
            })
        }
        _ => None,
    }
}
