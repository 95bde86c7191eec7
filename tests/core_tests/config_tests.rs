//! Tests for configuration
//!
//! These tests verify:
//! - Defaults and validation
//! - TOML loading with partial files
//! - Log flag tokens

use std::path::PathBuf;
use std::time::Duration;

use tallykv::config::{Config, EngineKind, LogFlags, WalSyncStrategy};

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_defaults_are_valid() {
    let config = Config::default();
    config.validate().unwrap();
    assert_eq!(config.listen_addr, "127.0.0.1:8962");
    assert_eq!(config.engine, EngineKind::File);
    assert_eq!(config.key_discard_interval, Duration::from_secs(90));
    assert_eq!(config.key_discard_ratio, 0.7);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = Config::from_toml(
        r#"
        listen_address = "0.0.0.0:7000"
        engine = "memory"
        key_discard_interval_secs = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.listen_addr, "0.0.0.0:7000");
    assert_eq!(config.engine, EngineKind::Memory);
    assert_eq!(config.key_discard_interval, Duration::from_secs(5));
    assert_eq!(config.data_dir, PathBuf::from("./.data/dump"));
}

#[test]
fn test_wal_sync_variants_parse() {
    let config = Config::from_toml(r#"wal_sync = "every_write""#).unwrap();
    assert_eq!(config.wal_sync_strategy, WalSyncStrategy::EveryWrite);

    let config = Config::from_toml("wal_sync = { every_n_entries = { count = 8 } }").unwrap();
    assert_eq!(
        config.wal_sync_strategy,
        WalSyncStrategy::EveryNEntries { count: 8 }
    );
}

#[test]
fn test_full_sample_file_parses() {
    let config = Config::from_toml(
        r#"
        engine = "file"
        data_path = "/var/lib/tallykv"
        wal_sync = { every_n_entries = { count = 100 } }
        listen_address = "127.0.0.1:8962"
        key_discard_interval_secs = 90
        key_discard_ratio = 0.7
        max_connections = 1024
        log_flags = ["date", "time"]
        log_filter = "info"
        "#,
    )
    .unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/var/lib/tallykv"));
    assert_eq!(
        config.wal_sync_strategy,
        WalSyncStrategy::EveryNEntries { count: 100 }
    );
    assert_eq!(config.max_connections, 1024);
    assert!(config.log_flags().unwrap().timestamps);
}

#[test]
fn test_rejects_bad_ratio_and_interval() {
    assert!(Config::from_toml("key_discard_ratio = 1.5").is_err());
    assert!(Config::from_toml("key_discard_ratio = 0.0").is_err());
    assert!(Config::from_toml("key_discard_interval_secs = 0").is_err());
}

#[test]
fn test_rejects_unknown_engine() {
    assert!(Config::from_toml(r#"engine = "rocks""#).is_err());
}

// =============================================================================
// Log Flags
// =============================================================================

#[test]
fn test_log_flags_default_and_none() {
    let empty: [&str; 0] = [];
    assert_eq!(LogFlags::parse(&empty).unwrap(), LogFlags::DEFAULT);
    assert_eq!(
        LogFlags::parse(&["none"]).unwrap(),
        LogFlags {
            timestamps: false,
            target: false
        }
    );
}

#[test]
fn test_log_flags_combine() {
    let flags = LogFlags::parse(&["time", "", "msgprefix"]).unwrap();
    assert!(flags.timestamps);
    assert!(flags.target);

    let flags = LogFlags::parse(&["utc"]).unwrap();
    assert!(flags.timestamps);
    assert!(!flags.target);
}

#[test]
fn test_log_flags_reject_mixed_none_and_unknown() {
    assert!(LogFlags::parse(&["none", "time"]).is_err());
    assert!(LogFlags::parse(&["shortfile"]).is_err());

    let config = Config::builder().log_flags(["bogus"]).build();
    assert!(config.validate().is_err());
}
