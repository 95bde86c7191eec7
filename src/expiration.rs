//! Expiration Model
//!
//! Expiry is an absolute unix time in whole seconds stored next to each
//! value, with 0 reserved for "never". Nothing fires per key: expired
//! entries are filtered out whenever they are read.
//!
//! ```text
//! NoEntry ──Set──▶ Persistent ──Expire(lease)──▶ Volatile(t)
//!                      ▲                             │
//!                      └──────────Persist────────────┘
//! Volatile(t) reads as NoEntry once now >= t
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// Stored expiry for entries that never expire
pub const NO_EXPIRY: u64 = 0;

/// Current unix time in whole seconds
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Absolute expiry for a lease starting at `now`.
///
/// Negative leases land in the past. The result is never 0, which would
/// otherwise read back as "no expiry".
pub fn expires_at(now: u64, lease_secs: i64) -> u64 {
    let at = if lease_secs >= 0 {
        now.saturating_add(lease_secs as u64)
    } else {
        now.saturating_sub(lease_secs.unsigned_abs())
    };
    at.max(1)
}

/// Whether an entry with this expiry is logically gone at `now`
pub fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at != NO_EXPIRY && expires_at <= now
}

/// Result of a TTL lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key absent or already expired
    NoKey,
    /// Key present without expiry
    NoExpiry,
    /// Whole seconds left, always at least 1
    Remaining(u64),
}

impl TtlStatus {
    /// Classify a key given its stored expiry (`None` when the key is absent)
    pub fn evaluate(expires_at: Option<u64>, now: u64) -> Self {
        match expires_at {
            None => TtlStatus::NoKey,
            Some(NO_EXPIRY) => TtlStatus::NoExpiry,
            Some(at) if at <= now => TtlStatus::NoKey,
            Some(at) => TtlStatus::Remaining(at - now),
        }
    }

    /// Integer sent on the wire: -2, -1 or the remaining seconds
    pub fn code(&self) -> i64 {
        match self {
            TtlStatus::NoKey => -2,
            TtlStatus::NoExpiry => -1,
            TtlStatus::Remaining(secs) => i64::try_from(*secs).unwrap_or(i64::MAX),
        }
    }
}
