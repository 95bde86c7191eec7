//! Tests for WAL Writer
//!
//! These tests verify:
//! - LSN generation and sequencing
//! - Batched appends
//! - Sync strategies
//! - Truncation and reopen
//! - Failed batches leave no partial frames behind

use tallykv::config::WalSyncStrategy;
use tallykv::wal::{WalReader, WalRecovery, WalWriter, MAX_KEY_SIZE};

use super::{delete, put, setup_temp_wal};

#[test]
fn test_lsns_start_at_one_and_increase() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.append(put("a", "1")).unwrap(), 1);
    assert_eq!(writer.append(put("b", "2")).unwrap(), 2);
    assert_eq!(writer.append(delete("a")).unwrap(), 3);
    assert_eq!(writer.current_lsn(), 4);
}

#[test]
fn test_batch_returns_last_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let last = writer
        .append_batch(vec![put("a", "1"), put("b", "2"), delete("c")])
        .unwrap();
    assert_eq!(last, 3);

    // Empty batch writes nothing
    assert_eq!(writer.append_batch(Vec::new()).unwrap(), 3);

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].operation, delete("c"));
}

#[test]
fn test_every_n_entries_still_reaches_the_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 1000 }).unwrap();

    for i in 0..10 {
        writer.append(put(&format!("k{}", i), "v")).unwrap();
    }

    // Not fsynced yet, but flushed to the OS
    let count = WalReader::open(&wal_path).unwrap().entries().count();
    assert_eq!(count, 10);
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        for i in 0..5 {
            writer.append(put(&format!("k{}", i), "v")).unwrap();
        }
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 6);
    assert_eq!(writer.append(put("k5", "v")).unwrap(), 6);
}

#[test]
fn test_truncate_empties_file_but_keeps_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(put("a", "1")).unwrap();
    writer.append(put("b", "2")).unwrap();
    writer.truncate().unwrap();

    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].lsn, 3);
}

#[test]
fn test_failed_batch_is_rolled_back() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();
    let good_len = writer.committed_len();
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), good_len);

    // The first frame is larger than the write buffer, so part of it reaches
    // the file before the oversized key is rejected
    let big_value = "v".repeat(20_000);
    let oversized_key = "k".repeat(MAX_KEY_SIZE + 1);
    let result = writer.append_batch(vec![
        put("b", &big_value),
        put(&oversized_key, "x"),
        put("c", "3"),
    ]);

    assert!(result.is_err());
    assert!(!writer.is_poisoned());
    assert_eq!(writer.committed_len(), good_len);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), good_len);
    assert_eq!(writer.current_lsn(), 2);

    // Later appends land right after the last good frame
    assert_eq!(writer.append(put("d", "4")).unwrap(), 2);
    drop(writer);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(result.entries_corrupted, 0);
    let ops: Vec<_> = entries.into_iter().map(|e| (e.lsn, e.operation)).collect();
    assert_eq!(ops, vec![(1, put("a", "1")), (2, put("d", "4"))]);
}

#[test]
fn test_key_at_size_limit_is_accepted() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let key = "k".repeat(MAX_KEY_SIZE);
    assert_eq!(writer.append(put(&key, "v")).unwrap(), 1);
    assert!(writer.append(put(&format!("{}k", key), "v")).is_err());
    assert_eq!(writer.append(delete(&key)).unwrap(), 2);
}
