//! Tests for IncrBy / IncrByFloat
//!
//! These tests verify:
//! - Absent keys count from zero
//! - Stored text format
//! - Constraint failures leave the value untouched
//! - Non-numeric values and overflow are rejected
//! - Concurrent increments never lose updates

use std::thread;

use tallykv::constraint::Constraint;
use tallykv::expiration::TtlStatus;
use tallykv::TallyError;

use super::running_store;

#[test]
fn test_incr_by_from_absent() {
    let (_temp, store) = running_store();

    assert_eq!(store.incr_by(b"n", 5, &[]).unwrap(), 5);
    assert_eq!(store.incr_by(b"n", -7, &[]).unwrap(), -2);
    assert_eq!(store.get(b"n").unwrap(), Some(b"-2".to_vec()));
}

#[test]
fn test_incr_by_float_stores_four_decimals() {
    let (_temp, store) = running_store();

    let value = store.incr_by_float(b"f", 1.5, &[]).unwrap();
    assert_eq!(value, 1.5);
    assert_eq!(store.get(b"f").unwrap(), Some(b"1.5000".to_vec()));

    store.incr_by_float(b"f", -0.25, &[]).unwrap();
    assert_eq!(store.get(b"f").unwrap(), Some(b"1.2500".to_vec()));
}

#[test]
fn test_incr_by_accepts_stored_integer_text() {
    let (_temp, store) = running_store();
    store.set(b"n", b"41").unwrap();
    assert_eq!(store.incr_by(b"n", 1, &[]).unwrap(), 42);

    // Integers parse as floats too
    assert_eq!(store.incr_by_float(b"n", 0.5, &[]).unwrap(), 42.5);
}

#[test]
fn test_constraint_violation_keeps_value() {
    let (_temp, store) = running_store();
    store.incr_by(b"stock", 2, &[]).unwrap();

    let result = store.incr_by(b"stock", -3, &[Constraint::NonNegative]);
    assert!(matches!(result, Err(TallyError::ConstraintViolated)));
    assert_eq!(store.get(b"stock").unwrap(), Some(b"2".to_vec()));

    let result = store.incr_by(
        b"stock",
        10,
        &[Constraint::GreaterOrEqual(0), Constraint::LessOrEqual(10)],
    );
    assert!(matches!(result, Err(TallyError::ConstraintViolated)));

    assert_eq!(store.incr_by(b"stock", -2, &[Constraint::NonNegative]).unwrap(), 0);
}

#[test]
fn test_float_strict_constraints() {
    let (_temp, store) = running_store();

    let result = store.incr_by_float(b"f", 1.0, &[Constraint::Less(1.0)]);
    assert!(matches!(result, Err(TallyError::ConstraintViolated)));
    assert_eq!(store.get(b"f").unwrap(), None);

    assert_eq!(
        store.incr_by_float(b"f", 1.0, &[Constraint::Greater(0.5)]).unwrap(),
        1.0
    );
}

#[test]
fn test_non_numeric_values_are_rejected() {
    let (_temp, store) = running_store();
    store.set(b"text", b"hello").unwrap();
    store.set(b"decimal", b"1.5").unwrap();

    assert!(matches!(store.incr_by(b"text", 1, &[]), Err(TallyError::NonInteger)));
    assert!(matches!(store.incr_by(b"decimal", 1, &[]), Err(TallyError::NonInteger)));
    assert!(matches!(
        store.incr_by_float(b"text", 1.0, &[]),
        Err(TallyError::NonFloat)
    ));
    assert_eq!(store.get(b"text").unwrap(), Some(b"hello".to_vec()));
}

#[test]
fn test_overflow_is_rejected() {
    let (_temp, store) = running_store();
    store.set(b"big", i64::MAX.to_string().as_bytes()).unwrap();

    assert!(matches!(store.incr_by(b"big", 1, &[]), Err(TallyError::Overflow)));
    assert_eq!(
        store.get(b"big").unwrap(),
        Some(i64::MAX.to_string().into_bytes())
    );
}

#[test]
fn test_increment_clears_expiry() {
    let (_temp, store) = running_store();
    store.incr_by(b"n", 1, &[]).unwrap();
    store.expire(b"n", 100).unwrap();

    store.incr_by(b"n", 1, &[]).unwrap();
    assert_eq!(store.ttl(b"n").unwrap(), TtlStatus::NoExpiry);
}

#[test]
fn test_concurrent_increments_converge() {
    let (_temp, store) = running_store();
    let threads = 8;
    let per_thread = 250;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    store.incr_by(b"counter", 1, &[]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (threads * per_thread).to_string();
    assert_eq!(store.get(b"counter").unwrap(), Some(expected.into_bytes()));
}

#[test]
fn test_concurrent_decrements_respect_floor() {
    let (_temp, store) = running_store();
    store.incr_by(b"tickets", 100, &[]).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let mut sold = 0;
                for _ in 0..50 {
                    if store.incr_by(b"tickets", -1, &[Constraint::NonNegative]).is_ok() {
                        sold += 1;
                    }
                }
                sold
            })
        })
        .collect();

    let sold: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(sold, 100);
    assert_eq!(store.get(b"tickets").unwrap(), Some(b"0".to_vec()));
}
