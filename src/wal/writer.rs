//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, TallyError};

use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Path of the log file (kept for diagnostics)
    path: PathBuf,

    /// Buffered append handle
    writer: BufWriter<File>,

    /// LSN that the next appended entry receives
    current_lsn: u64,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    /// File length covered by complete, acknowledged frames
    committed_len: u64,

    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is recovered first so that a torn tail is cut off
    /// and LSNs continue after the last valid entry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let last_lsn = if path.exists() {
            let (_, result) = WalRecovery::recover(path)?;
            result.last_lsn
        } else {
            0
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let committed_len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            committed_len,
            poisoned: false,
        })
    }

    /// Append an operation, returning the LSN it was logged under
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        self.append_batch(vec![operation])
    }

    /// Append several operations with a single sync decision at the end.
    ///
    /// Either every frame of the batch is accepted or none is: on failure the
    /// file is cut back to the last complete frame and LSNs are reused.
    /// Returns the LSN of the last entry (or the previous LSN for an empty batch).
    pub fn append_batch(&mut self, operations: Vec<Operation>) -> Result<u64> {
        if self.poisoned {
            return Err(TallyError::Storage(format!(
                "WAL {} is unusable after a failed rollback",
                self.path.display()
            )));
        }

        let start_lsn = self.current_lsn;
        let start_unsynced = self.unsynced;

        match self.write_batch(operations) {
            Ok(written) => {
                self.committed_len += written;
                Ok(self.current_lsn - 1)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback(start_lsn, start_unsynced) {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %rollback,
                        "WAL rollback failed, refusing further appends"
                    );
                    self.poisoned = true;
                }
                Err(e)
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard all entries (called once they are durable in an SSTable).
    /// LSNs keep increasing across truncation.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;
        self.unsynced = 0;
        self.committed_len = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of the log covered by complete frames
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    /// Whether appends are refused after a failed rollback
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Write every frame of a batch and apply the sync policy, returning
    /// the number of bytes added
    fn write_batch(&mut self, operations: Vec<Operation>) -> Result<u64> {
        let mut written = 0u64;
        for operation in operations {
            let frame = WalEntry::new(self.current_lsn, operation).serialize()?;

            self.writer
                .write_all(&frame)
                .map_err(|e| TallyError::Storage(format!("WAL append failed: {}", e)))?;

            written += frame.len() as u64;
            self.current_lsn += 1;
            self.unsynced += 1;
        }
        self.maybe_sync()?;
        Ok(written)
    }

    /// Drop buffered bytes and cut the file back to `committed_len`
    fn rollback(&mut self, lsn: u64, unsynced: usize) -> Result<()> {
        let file = self.writer.get_ref().try_clone()?;
        let old = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back the buffer instead of flushing it
        let (_, _discarded) = old.into_parts();

        self.writer.get_ref().set_len(self.committed_len)?;
        self.current_lsn = lsn;
        self.unsynced = unsynced;

        tracing::warn!(
            path = %self.path.display(),
            committed_len = self.committed_len,
            "rolled back partial WAL append"
        );
        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };

        if due {
            self.sync()
        } else {
            // Hand the bytes to the OS so a process crash loses nothing
            self.writer.flush()?;
            Ok(())
        }
    }
}
