//! Tests for reply helpers and error rendering

use tallykv::protocol::Reply;
use tallykv::TallyError;

#[test]
fn test_optional_bulk_and_boolean() {
    assert_eq!(Reply::optional_bulk(None), Reply::Null);
    assert_eq!(
        Reply::optional_bulk(Some(b"v".to_vec())),
        Reply::Bulk(b"v".to_vec())
    );
    assert_eq!(Reply::boolean(true), Reply::Integer(1));
    assert_eq!(Reply::boolean(false), Reply::Integer(0));
}

#[test]
fn test_errors_render_with_err_prefix() {
    let cases = [
        (TallyError::NonInteger, "ERR value is not an integer or out of range"),
        (TallyError::NonFloat, "ERR value is not a valid float"),
        (TallyError::ConstraintViolated, "ERR violate constraints"),
        (TallyError::Unavailable, "ERR database is unavailable"),
        (TallyError::wrong_arity("Get"), "ERR wrong number of arguments for 'Get' command"),
        (TallyError::protocol("syntax error"), "ERR syntax error"),
        (TallyError::protocol("ERR already prefixed"), "ERR already prefixed"),
    ];

    for (error, expected) in cases {
        let reply = Reply::from_error(&error);
        assert!(reply.is_error());
        assert_eq!(reply, Reply::Error(expected.to_string()));
    }
}
