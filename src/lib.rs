//! # TallyKV
//!
//! A persistent key-value store speaking RESP, with:
//! - Atomic counters guarded by constraints (`IncrBy`, `IncrByFloat`)
//! - Per-key expiry (`Expire`, `Persist`, `Ttl`)
//! - Cursor scans with prefix, direction and optional values
//! - Write-Ahead Logging (WAL) for durability and crash recovery
//! - Background reclamation of deleted and expired entries
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TCP Server (RESP, thread per client)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │   CommandTable ── constraint / expiration / scan helpers     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │   Store (lifecycle) ──────────────── KeyDiscardTask (tick)   │
//! └─────────────────────┬───────────────────────────────────┬───┘
//!                       │  view / update                    │ reclaim
//! ┌─────────────────────▼───────────────────────────────────▼───┐
//! │                         Engine                               │
//! │      WAL (append)  ──▶  MemTable (RwLock)  ──▶  SSTables     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

pub mod expiration;
pub mod constraint;
pub mod scan;
pub mod discard;
pub mod store;
pub mod command;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TallyError};
pub use config::Config;
pub use engine::Engine;
pub use store::Store;
pub use command::CommandTable;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TallyKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
