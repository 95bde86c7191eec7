//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest key accepted in a log entry (same limit as badger)
pub const MAX_KEY_SIZE: usize = 65000;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair; `expires_at` is unix seconds, 0 = never
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        expires_at: u64,
    },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// Key touched by this operation
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as a full frame: header + bincode payload
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let key_len = self.operation.key().len();
        if key_len > MAX_KEY_SIZE {
            return Err(TallyError::Storage(format!(
                "Key with size {} exceeded {} limit",
                key_len, MAX_KEY_SIZE
            )));
        }

        let data = bincode::serialize(self)
            .map_err(|e| TallyError::Serialization(format!("WAL entry encode: {}", e)))?;
        if data.len() > u32::MAX as usize {
            return Err(TallyError::Storage(format!(
                "WAL entry of {} bytes does not fit in a frame",
                data.len()
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
        frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Decode one complete frame.
    ///
    /// Fails with `WalCorruption` when the frame is short, the CRC does not
    /// match, or the header LSN disagrees with the payload.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (lsn, crc, len) = parse_header(bytes)?;

        let data = bytes
            .get(HEADER_SIZE..HEADER_SIZE + len)
            .ok_or_else(|| {
                TallyError::WalCorruption(format!(
                    "incomplete entry data: expected {} bytes, got {}",
                    len,
                    bytes.len() - HEADER_SIZE
                ))
            })?;

        if crc32fast::hash(data) != crc {
            return Err(TallyError::WalCorruption(format!(
                "CRC mismatch for entry with LSN {}",
                lsn
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| TallyError::WalCorruption(format!("undecodable entry: {}", e)))?;

        if entry.lsn != lsn {
            return Err(TallyError::WalCorruption(format!(
                "LSN mismatch: header {} payload {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Split a frame header into (lsn, crc, data_len)
pub(crate) fn parse_header(bytes: &[u8]) -> Result<(u64, u32, usize)> {
    if bytes.len() < HEADER_SIZE {
        return Err(TallyError::WalCorruption(format!(
            "incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut lsn = [0u8; 8];
    lsn.copy_from_slice(&bytes[0..8]);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&bytes[8..12]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[12..16]);

    Ok((
        u64::from_le_bytes(lsn),
        u32::from_le_bytes(crc),
        u32::from_le_bytes(len) as usize,
    ))
}
