//! Store-level test suite: lifecycle, data operations, counters, scans,
//! the key discard scheduler and the helpers they are built on

mod config_tests;
mod constraint_tests;
mod counter_tests;
mod expiration_tests;
mod scan_tests;
mod store_tests;

use std::sync::Arc;

use tallykv::config::{Config, EngineKind};
use tallykv::Store;
use tempfile::TempDir;

/// A started file-backed store in a temporary directory
pub fn running_store() -> (TempDir, Arc<Store>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let store = Store::open(config).unwrap();
    store.start().unwrap();
    (temp_dir, Arc::new(store))
}

/// A started in-memory store
pub fn running_memory_store() -> Arc<Store> {
    let config = Config::builder().engine(EngineKind::Memory).build();
    let store = Store::open(config).unwrap();
    store.start().unwrap();
    Arc::new(store)
}
