//! Tests for the Store
//!
//! These tests verify:
//! - Created → Running → Stopped transitions
//! - Operations are refused outside Running
//! - Get/Set/Del/Exists semantics
//! - Expire/Persist/Ttl semantics
//! - Data survives stop and reopen

use tallykv::config::Config;
use tallykv::expiration::TtlStatus;
use tallykv::store::Lifecycle;
use tallykv::{Store, TallyError};
use tempfile::TempDir;

use super::{running_memory_store, running_store};

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_operations_unavailable_until_started() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(Config::builder().data_dir(temp_dir.path()).build()).unwrap();

    assert_eq!(store.state(), Lifecycle::Created);
    assert!(!store.is_running());
    assert!(matches!(store.get(b"k"), Err(TallyError::Unavailable)));
    assert!(matches!(store.set(b"k", b"v"), Err(TallyError::Unavailable)));

    store.start().unwrap();
    assert_eq!(store.state(), Lifecycle::Running);
    store.set(b"k", b"v").unwrap();
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let (_temp, store) = running_store();
    store.start().unwrap();
    assert_eq!(store.state(), Lifecycle::Running);

    store.stop().unwrap();
    store.stop().unwrap();
    assert_eq!(store.state(), Lifecycle::Stopped);
}

#[test]
fn test_stopped_store_cannot_restart() {
    let (_temp, store) = running_store();
    store.stop().unwrap();

    assert!(matches!(store.start(), Err(TallyError::InvalidLifecycle(_))));
    assert!(matches!(store.exists(b"k"), Err(TallyError::Unavailable)));
}

#[test]
fn test_stop_before_start() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(Config::builder().data_dir(temp_dir.path()).build()).unwrap();
    store.stop().unwrap();
    assert_eq!(store.state(), Lifecycle::Stopped);
}

#[test]
fn test_open_rejects_invalid_config() {
    let config = Config::builder().key_discard_ratio(1.5).build();
    assert!(matches!(Store::open(config), Err(TallyError::Config(_))));
}

#[test]
fn test_data_survives_stop_and_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Store::open(Config::builder().data_dir(temp_dir.path()).build()).unwrap();
        store.start().unwrap();
        store.set(b"durable", b"yes").unwrap();
        store.incr_by(b"hits", 3, &[]).unwrap();
        store.stop().unwrap();
    }

    let store = Store::open(Config::builder().data_dir(temp_dir.path()).build()).unwrap();
    store.start().unwrap();
    assert_eq!(store.get(b"durable").unwrap(), Some(b"yes".to_vec()));
    assert_eq!(store.get(b"hits").unwrap(), Some(b"3".to_vec()));
}

// =============================================================================
// Keys
// =============================================================================

#[test]
fn test_set_get_del_exists() {
    let (_temp, store) = running_store();

    assert_eq!(store.get(b"k").unwrap(), None);
    assert!(!store.exists(b"k").unwrap());

    store.set(b"k", b"v1").unwrap();
    store.set(b"k", b"v2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
    assert!(store.exists(b"k").unwrap());

    store.del(b"k").unwrap();
    store.del(b"never-there").unwrap();
    assert_eq!(store.get(b"k").unwrap(), None);
}

#[test]
fn test_empty_key_and_value() {
    let store = running_memory_store();
    store.set(b"", b"").unwrap();
    assert_eq!(store.get(b"").unwrap(), Some(Vec::new()));
    assert!(store.exists(b"").unwrap());
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn test_ttl_states() {
    let (_temp, store) = running_store();

    assert_eq!(store.ttl(b"k").unwrap(), TtlStatus::NoKey);

    store.set(b"k", b"v").unwrap();
    assert_eq!(store.ttl(b"k").unwrap(), TtlStatus::NoExpiry);

    assert!(store.expire(b"k", 100).unwrap());
    match store.ttl(b"k").unwrap() {
        TtlStatus::Remaining(secs) => assert!((99..=100).contains(&secs)),
        other => panic!("unexpected ttl {:?}", other),
    }
    assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_expire_missing_key() {
    let (_temp, store) = running_store();
    assert!(!store.expire(b"missing", 10).unwrap());
    assert!(!store.exists(b"missing").unwrap());
}

#[test]
fn test_non_positive_lease_expires_immediately() {
    let (_temp, store) = running_store();
    store.set(b"a", b"1").unwrap();
    store.set(b"b", b"2").unwrap();

    assert!(store.expire(b"a", 0).unwrap());
    assert!(store.expire(b"b", -5).unwrap());

    assert_eq!(store.get(b"a").unwrap(), None);
    assert_eq!(store.ttl(b"b").unwrap(), TtlStatus::NoKey);
}

#[test]
fn test_persist_and_set_clear_expiry() {
    let (_temp, store) = running_store();

    assert!(!store.persist(b"k").unwrap());

    store.set(b"k", b"v").unwrap();
    assert!(store.persist(b"k").unwrap());

    store.expire(b"k", 100).unwrap();
    assert!(store.persist(b"k").unwrap());
    assert_eq!(store.ttl(b"k").unwrap(), TtlStatus::NoExpiry);

    store.expire(b"k", 100).unwrap();
    store.set(b"k", b"fresh").unwrap();
    assert_eq!(store.ttl(b"k").unwrap(), TtlStatus::NoExpiry);
}

#[test]
fn test_expiry_survives_flush() {
    let (_temp, store) = running_store();
    store.set(b"k", b"v").unwrap();
    store.expire(b"k", 1000).unwrap();
    store.engine().flush().unwrap();

    assert!(matches!(store.ttl(b"k").unwrap(), TtlStatus::Remaining(_)));
}
