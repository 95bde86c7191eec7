//! Tests for expiry arithmetic
//!
//! These tests verify:
//! - Lease to absolute expiry conversion
//! - The inclusive expiry boundary
//! - Ttl reply codes

use tallykv::expiration::{expires_at, is_expired, TtlStatus, NO_EXPIRY};

#[test]
fn test_lease_is_added_to_now() {
    assert_eq!(expires_at(1_000, 10), 1_010);
    assert_eq!(expires_at(1_000, 0), 1_000);
    assert_eq!(expires_at(1_000, -5), 995);
}

#[test]
fn test_expiry_never_collides_with_no_expiry() {
    assert_eq!(expires_at(3, -100), 1);
    assert_eq!(expires_at(0, 0), 1);
    assert_eq!(expires_at(u64::MAX - 1, i64::MAX), u64::MAX);
}

#[test]
fn test_expiry_boundary_is_inclusive() {
    assert!(!is_expired(NO_EXPIRY, u64::MAX));
    assert!(is_expired(100, 100));
    assert!(is_expired(99, 100));
    assert!(!is_expired(101, 100));
}

#[test]
fn test_ttl_codes() {
    assert_eq!(TtlStatus::evaluate(None, 50).code(), -2);
    assert_eq!(TtlStatus::evaluate(Some(0), 50).code(), -1);
    assert_eq!(TtlStatus::evaluate(Some(50), 50), TtlStatus::NoKey);
    assert_eq!(TtlStatus::evaluate(Some(51), 50), TtlStatus::Remaining(1));
    assert_eq!(TtlStatus::evaluate(Some(60), 50).code(), 10);
}
