//! Reply definitions
//!
//! Represents replies sent to clients.

use crate::error::TallyError;

/// A RESP2 reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>`
    Simple(String),

    /// `-<message>`
    Error(String),

    /// `:<n>`
    Integer(i64),

    /// `$<len>` followed by the bytes
    Bulk(Vec<u8>),

    /// `$-1`
    Null,

    /// `*<n>` followed by n replies
    Array(Vec<Reply>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Bulk reply, or null when absent
    pub fn optional_bulk(value: Option<Vec<u8>>) -> Self {
        value.map_or(Reply::Null, Reply::Bulk)
    }

    /// Array of bulk strings
    pub fn bulk_array(items: Vec<Vec<u8>>) -> Self {
        Reply::Array(items.into_iter().map(Reply::Bulk).collect())
    }

    /// `:1` / `:0`
    pub fn boolean(value: bool) -> Self {
        Reply::Integer(i64::from(value))
    }

    /// Error reply for a failed command
    pub fn from_error(error: &TallyError) -> Self {
        Reply::Error(error.to_reply_message())
    }

    /// Whether this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
