//! Protocol Module
//!
//! RESP2 wire protocol for client-server communication.
//!
//! ## Request Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<name>\r\n
//! $<len>\r\n<arg>\r\n
//! ...
//! ```
//! Inline requests (`GET key\r\n`, space separated) are accepted too.
//!
//! ## Reply Types
//! - `+OK\r\n`            simple string
//! - `-ERR message\r\n`   error
//! - `:42\r\n`            integer
//! - `$3\r\nfoo\r\n`      bulk string (`$-1\r\n` = null)
//! - `*2\r\n...`          array

mod request;
mod reply;
mod codec;

pub use request::Request;
pub use reply::Reply;
pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, read_reply, read_request,
    write_reply, write_request, MAX_ARRAY_LEN, MAX_BULK_SIZE, MAX_INLINE_SIZE,
};
