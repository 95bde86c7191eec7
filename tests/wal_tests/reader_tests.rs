//! Tests for WAL Reader
//!
//! These tests verify:
//! - Sequential reading in write order
//! - Clean end of file
//! - Torn tails surface as corruption

use std::fs::OpenOptions;
use std::io::Write;

use tallykv::config::WalSyncStrategy;
use tallykv::wal::{WalReader, WalWriter};
use tallykv::TallyError;

use super::{put, put_expiring, setup_temp_wal};

#[test]
fn test_empty_file_has_no_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    std::fs::File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_reads_in_write_order() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("first", "1")).unwrap();
        writer.append(put_expiring("second", "2", 42)).unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();
    let first = reader.next_entry().unwrap().unwrap();
    let second = reader.next_entry().unwrap().unwrap();

    assert_eq!(first.operation, put("first", "1"));
    assert_eq!(second.operation, put_expiring("second", "2", 42));
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_torn_tail_is_reported_after_valid_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
    }
    {
        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();
    }

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(TallyError::WalCorruption(_))));
}
