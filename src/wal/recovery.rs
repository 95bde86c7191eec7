//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{Result, TallyError};

use super::entry::parse_header;
use super::{WalEntry, HEADER_SIZE};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted frame
    /// 3. Truncate everything from that frame on
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let bytes = fs::read(path)?;
        let (entries, mut result, valid_len) = Self::scan(&bytes);

        if valid_len < bytes.len() {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
            result.was_truncated = true;

            tracing::warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - valid_len,
                "truncated damaged WAL tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let bytes = fs::read(path)?;
        let (_, mut result, valid_len) = Self::scan(&bytes);
        result.was_truncated = valid_len < bytes.len();
        Ok(result)
    }

    /// Walk frames until the data runs out or stops making sense.
    ///
    /// Returns the decoded entries, stats, and the length of the valid prefix.
    fn scan(bytes: &[u8]) -> (Vec<WalEntry>, RecoveryResult, usize) {
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut offset = 0;

        while offset < bytes.len() {
            let rest = &bytes[offset..];

            // Torn header
            let Ok((_, _, len)) = parse_header(rest) else {
                break;
            };

            // Torn payload
            if rest.len() < HEADER_SIZE + len {
                break;
            }

            match WalEntry::deserialize(&rest[..HEADER_SIZE + len]) {
                Ok(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                    offset += HEADER_SIZE + len;
                }
                Err(TallyError::WalCorruption(reason)) => {
                    tracing::warn!(offset, %reason, "corrupted WAL entry");
                    result.entries_corrupted += 1;
                    break;
                }
                Err(_) => break,
            }
        }

        (entries, result, offset)
    }
}
