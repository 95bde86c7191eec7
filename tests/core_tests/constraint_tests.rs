//! Tests for constraint clauses
//!
//! These tests verify:
//! - Predicates for integer and float constraints
//! - Clause parsing, ordering and tolerance for unknown tokens
//! - Error messages for malformed clauses

use tallykv::constraint::{check_all, parse_clauses, Constraint};
use tallykv::TallyError;

fn args(tokens: &[&str]) -> Vec<Vec<u8>> {
    tokens.iter().map(|t| t.as_bytes().to_vec()).collect()
}

// =============================================================================
// Predicates
// =============================================================================

#[test]
fn test_integer_predicates() {
    assert!(Constraint::LessOrEqual(5i64).check(5));
    assert!(!Constraint::LessOrEqual(5i64).check(6));
    assert!(Constraint::GreaterOrEqual(-1i64).check(-1));
    assert!(Constraint::<i64>::NonNegative.check(0));
    assert!(!Constraint::<i64>::NonNegative.check(-1));
    assert!(!Constraint::<i64>::NonZero.check(0));
}

#[test]
fn test_float_strict_predicates() {
    assert!(Constraint::Less(1.0f64).check(0.9999));
    assert!(!Constraint::Less(1.0f64).check(1.0));
    assert!(Constraint::Greater(1.0f64).check(1.5));
    assert!(!Constraint::<f64>::NonZero.check(0.0));
}

#[test]
fn test_first_failure_aborts() {
    let constraints = [Constraint::NonNegative, Constraint::LessOrEqual(3i64)];
    assert!(check_all(&constraints, 2).is_ok());
    assert!(matches!(
        check_all(&constraints, 4),
        Err(TallyError::ConstraintViolated)
    ));
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_clauses_parse_in_order_and_case_insensitively() {
    let parsed: Vec<Constraint<i64>> =
        parse_clauses(&args(&["constraint", "non_negative", "CONSTRAINT", "le", "10"])).unwrap();
    assert_eq!(
        parsed,
        vec![Constraint::NonNegative, Constraint::LessOrEqual(10)]
    );
}

#[test]
fn test_unknown_tokens_between_clauses_are_skipped() {
    let parsed: Vec<Constraint<f64>> =
        parse_clauses(&args(&["junk", "CONSTRAINT", ">", "1.5", "more"])).unwrap();
    assert_eq!(parsed, vec![Constraint::Greater(1.5)]);
}

#[test]
fn test_truncated_clauses_are_protocol_errors() {
    let err = parse_clauses::<i64>(&args(&["CONSTRAINT"])).unwrap_err();
    assert_eq!(err.to_reply_message(), "ERR missing constraint type");

    let err = parse_clauses::<i64>(&args(&["CONSTRAINT", "<="])).unwrap_err();
    assert_eq!(err.to_reply_message(), "ERR missing constraint criteria");
}

#[test]
fn test_strict_forms_rejected_for_integers() {
    let err = parse_clauses::<i64>(&args(&["CONSTRAINT", "lt", "3"])).unwrap_err();
    assert_eq!(err.to_reply_message(), "ERR unsupported constraint type 'LT'");
}

#[test]
fn test_non_numeric_criteria() {
    let err = parse_clauses::<i64>(&args(&["CONSTRAINT", "<=", "ten"])).unwrap_err();
    assert_eq!(
        err.to_reply_message(),
        "ERR value is not an integer or out of range"
    );

    let err = parse_clauses::<f64>(&args(&["CONSTRAINT", "<=", "nan"])).unwrap_err();
    assert_eq!(err.to_reply_message(), "ERR value is not a valid float");
}
