//! Tests for Scan
//!
//! These tests verify:
//! - Cursor positioning and inclusive paging
//! - Prefix, reverse and value options
//! - Prefix bounds, including cursors outside the prefix range
//! - Results stay correct across flush and reclaim
//! - Option parsing and reply flattening

use tallykv::scan::{flatten, ScanItem, ScanOptions};
use tallykv::Store;

use super::running_store;

fn args(tokens: &[&str]) -> Vec<Vec<u8>> {
    tokens.iter().map(|t| t.as_bytes().to_vec()).collect()
}

fn keys(store: &Store, cursor: &str, options: &ScanOptions) -> Vec<String> {
    store
        .scan(cursor.as_bytes(), options)
        .unwrap()
        .into_iter()
        .map(|item| String::from_utf8(item.key).unwrap())
        .collect()
}

fn seed(store: &Store) {
    // `user` and `user;` sit just outside the `user:` prefix range
    for key in ["a", "b", "user", "user:1", "user:2", "user:3", "user;", "z"] {
        store.set(key.as_bytes(), format!("v-{}", key).as_bytes()).unwrap();
    }
}

#[test]
fn test_scan_everything() {
    let (_temp, store) = running_store();
    seed(&store);

    assert_eq!(
        keys(&store, "", &ScanOptions::default()),
        vec!["a", "b", "user", "user:1", "user:2", "user:3", "user;", "z"]
    );
}

#[test]
fn test_scan_empty_store() {
    let (_temp, store) = running_store();
    assert!(store.scan(b"", &ScanOptions::default()).unwrap().is_empty());
}

#[test]
fn test_cursor_is_inclusive() {
    let (_temp, store) = running_store();
    seed(&store);

    assert_eq!(
        keys(&store, "user:2", &ScanOptions::default()),
        vec!["user:2", "user:3", "user;", "z"]
    );
    assert_eq!(
        keys(&store, "c", &ScanOptions::default()),
        vec!["user", "user:1", "user:2", "user:3", "user;", "z"]
    );
}

#[test]
fn test_prefix_scan() {
    let (_temp, store) = running_store();
    seed(&store);
    let options = ScanOptions::default().with_prefix("user:");

    assert_eq!(keys(&store, "", &options), vec!["user:1", "user:2", "user:3"]);
    assert_eq!(keys(&store, "user:2", &options), vec!["user:2", "user:3"]);
}

#[test]
fn test_forward_cursor_outside_prefix_yields_nothing() {
    let (_temp, store) = running_store();
    seed(&store);
    let options = ScanOptions::default().with_prefix("user:");

    // Below the range: the first key at the cursor is not prefixed
    assert!(keys(&store, "a", &options).is_empty());
    assert!(keys(&store, "user", &options).is_empty());

    // Past the range
    assert!(keys(&store, "user;", &options).is_empty());
    assert!(keys(&store, "zz", &options).is_empty());
}

#[test]
fn test_reverse_cursor_outside_prefix_yields_nothing() {
    let (_temp, store) = running_store();
    seed(&store);
    let options = ScanOptions::default().with_prefix("user:").with_reverse();

    // Above the range: the last key at or before the cursor is not prefixed
    assert!(keys(&store, "zz", &options).is_empty());
    assert!(keys(&store, "user;", &options).is_empty());

    // Below the range
    assert!(keys(&store, "b", &options).is_empty());

    // Inside the range but past every stored key
    assert_eq!(
        keys(&store, "user:~", &options),
        vec!["user:3", "user:2", "user:1"]
    );
}

#[test]
fn test_reverse_scan() {
    let (_temp, store) = running_store();
    seed(&store);

    let options = ScanOptions::default().with_reverse();
    assert_eq!(
        keys(&store, "", &options),
        vec!["z", "user;", "user:3", "user:2", "user:1", "user", "b", "a"]
    );
    assert_eq!(keys(&store, "b", &options), vec!["b", "a"]);

    let options = ScanOptions::default().with_prefix("user:").with_reverse();
    assert_eq!(keys(&store, "", &options), vec!["user:3", "user:2", "user:1"]);
    assert_eq!(keys(&store, "user:2", &options), vec!["user:2", "user:1"]);
}

#[test]
fn test_scan_with_values() {
    let (_temp, store) = running_store();
    store.set(b"k1", b"one").unwrap();
    store.set(b"k2", b"two").unwrap();

    let items = store
        .scan(b"", &ScanOptions::default().with_values())
        .unwrap();
    assert_eq!(
        flatten(items),
        vec![b"k1".to_vec(), b"one".to_vec(), b"k2".to_vec(), b"two".to_vec()]
    );

    let items = store.scan(b"", &ScanOptions::default()).unwrap();
    assert!(items.iter().all(|item| item.value.is_none()));
}

#[test]
fn test_scan_skips_deleted_and_expired() {
    let (_temp, store) = running_store();
    seed(&store);
    store.del(b"b").unwrap();
    store.expire(b"z", 0).unwrap();

    assert_eq!(
        keys(&store, "", &ScanOptions::default()),
        vec!["a", "user", "user:1", "user:2", "user:3", "user;"]
    );
}

#[test]
fn test_scan_after_flush_and_reclaim() {
    let (_temp, store) = running_store();
    seed(&store);
    store.engine().flush().unwrap();

    store.del(b"a").unwrap();
    store.del(b"b").unwrap();
    store.del(b"z").unwrap();
    store.set(b"user:0", b"late").unwrap();
    store.engine().flush().unwrap();

    let before = keys(&store, "", &ScanOptions::default());
    store.engine().reclaim(0.1).unwrap();
    let after = keys(&store, "", &ScanOptions::default());

    assert_eq!(
        before,
        vec!["user", "user:0", "user:1", "user:2", "user:3", "user;"]
    );
    assert_eq!(before, after);
    assert_eq!(store.engine().sstable_count(), 1);
}

// =============================================================================
// Option Parsing
// =============================================================================

#[test]
fn test_parses_all_options() {
    let options =
        ScanOptions::from_args(&args(&["prefix", "user:", "With_Reverse", "WITH_VALUE"])).unwrap();
    assert_eq!(options.prefix, b"user:".to_vec());
    assert!(options.reverse);
    assert!(options.include_values);
}

#[test]
fn test_prefix_without_value_is_arity_error() {
    let err = ScanOptions::from_args(&args(&["PREFIX"])).unwrap_err();
    assert_eq!(
        err.to_reply_message(),
        "ERR wrong number of arguments for 'Scan' command"
    );
}

#[test]
fn test_unknown_options_are_ignored() {
    let options = ScanOptions::from_args(&args(&["COUNT", "10"])).unwrap();
    assert_eq!(options, ScanOptions::default());
}

#[test]
fn test_flatten_interleaves_values() {
    let items = vec![
        ScanItem {
            key: b"a".to_vec(),
            value: Some(b"1".to_vec()),
        },
        ScanItem {
            key: b"b".to_vec(),
            value: Some(b"2".to_vec()),
        },
    ];
    assert_eq!(
        flatten(items),
        vec![b"a".to_vec(), b"1".to_vec(), b"b".to_vec(), b"2".to_vec()]
    );
}
