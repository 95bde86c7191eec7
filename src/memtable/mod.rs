//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Track size for flush triggers
//! - Ordered iteration for SSTable creation and scans
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for SSTable generation and range scans)
//! - A whole transaction batch is applied under one write lock, so readers
//!   never see half of it

mod table;

pub use table::{MemTable, MemTableIterator};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value; `expires_at` is unix seconds, 0 = never
    Value { value: Vec<u8>, expires_at: u64 },

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// A value that never expires
    pub fn persistent(value: Vec<u8>) -> Self {
        MemTableEntry::Value {
            value,
            expires_at: 0,
        }
    }

    /// A value that has not expired at `now`
    pub fn is_live(&self, now: u64) -> bool {
        match self {
            MemTableEntry::Value { expires_at, .. } => {
                !crate::expiration::is_expired(*expires_at, now)
            }
            MemTableEntry::Tombstone => false,
        }
    }

    /// Approximate heap footprint, used for flush decisions
    pub(crate) fn footprint(&self) -> usize {
        match self {
            MemTableEntry::Value { value, .. } => value.len() + 8,
            MemTableEntry::Tombstone => 0,
        }
    }
}
