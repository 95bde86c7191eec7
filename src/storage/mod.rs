//! Storage Module
//!
//! Persistent storage layer using SSTables.
//!
//! ## Responsibilities
//! - Persist data to disk in sorted format
//! - Point lookups and range reads for scans
//! - Compaction that reclaims space held by tombstones, shadowed
//!   versions and expired entries

mod sstable;
mod manager;

use std::ops::Bound;

pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader, FLAG_BASE};
pub use manager::{ReclaimStats, StorageManager};

/// True when no key can satisfy both bounds.
///
/// `BTreeMap::range` panics on inverted bounds, so every range read checks
/// this first.
pub(crate) fn is_empty_range(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u))
        | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}
