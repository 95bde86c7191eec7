//! Protocol codec
//!
//! Encoding and decoding functions for RESP2.
//!
//! Requests arrive either as an array of bulk strings or as an inline
//! line of space separated words. Replies are written with the five
//! RESP2 types; the client side decodes them with [`read_reply`].

use std::io::{BufRead, Cursor, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TallyError};

use super::{Reply, Request};

/// Maximum bulk string size (16 MB)
pub const MAX_BULK_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of elements in a request array
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum length of a single header or inline line (64 KB)
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request as an array of bulk strings
pub fn encode_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::new();
    put_header(&mut buf, b'*', (request.args.len() + 1) as i64);
    put_bulk(&mut buf, &request.name);
    for arg in &request.args {
        put_bulk(&mut buf, arg);
    }
    buf.freeze()
}

/// Decode one complete request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    read_request(&mut Cursor::new(bytes))?
        .ok_or_else(|| TallyError::protocol("Protocol error: empty request"))
}

/// Read the next request from a stream
///
/// Returns `Ok(None)` when the stream ends cleanly between requests.
/// Blank inline lines are skipped.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<Request>> {
    loop {
        let line = match read_line(reader)? {
            Some(line) => line,
            None => return Ok(None),
        };

        if line.first() == Some(&b'*') {
            let count = parse_length(&line[1..])?;
            let count = match count {
                Some(count) if count > MAX_ARRAY_LEN => {
                    return Err(TallyError::protocol(format!(
                        "Protocol error: invalid multibulk length {}",
                        count
                    )))
                }
                Some(count) => count,
                // `*-1` carries no command
                None => continue,
            };

            let mut parts = Vec::with_capacity(count);
            for _ in 0..count {
                parts.push(read_bulk_arg(reader)?);
            }
            match Request::from_parts(parts) {
                Some(request) => return Ok(Some(request)),
                None => continue,
            }
        }

        let parts: Vec<Vec<u8>> = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|word| !word.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        if let Some(request) = Request::from_parts(parts) {
            return Ok(Some(request));
        }
    }
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Bytes {
    let mut buf = BytesMut::new();
    put_reply(&mut buf, reply);
    buf.freeze()
}

/// Decode one complete reply from bytes
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    read_reply(&mut Cursor::new(bytes))
}

/// Read the next reply from a stream (blocks until complete)
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?.ok_or_else(|| {
        TallyError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before reply",
        ))
    })?;

    let (kind, rest) = match line.split_first() {
        Some((kind, rest)) => (*kind, rest),
        None => return Err(TallyError::protocol("Protocol error: empty reply line")),
    };

    match kind {
        b'+' => Ok(Reply::Simple(String::from_utf8_lossy(rest).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => Ok(Reply::Integer(parse_integer(rest)?)),
        b'$' => match parse_length(rest)? {
            None => Ok(Reply::Null),
            Some(len) => Ok(Reply::Bulk(read_bulk_body(reader, len)?)),
        },
        b'*' => match parse_length(rest)? {
            None => Ok(Reply::Null),
            Some(count) => {
                let mut items = Vec::with_capacity(count.min(MAX_ARRAY_LEN));
                for _ in 0..count {
                    items.push(read_reply(reader)?);
                }
                Ok(Reply::Array(items))
            }
        },
        other => Err(TallyError::protocol(format!(
            "Protocol error: unknown reply type '{}'",
            other as char
        ))),
    }
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn put_reply(buf: &mut BytesMut, reply: &Reply) {
    match reply {
        Reply::Simple(text) => put_line(buf, b'+', text),
        Reply::Error(message) => put_line(buf, b'-', message),
        Reply::Integer(n) => put_header(buf, b':', *n),
        Reply::Bulk(bytes) => put_bulk(buf, bytes),
        Reply::Null => buf.put_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            put_header(buf, b'*', items.len() as i64);
            for item in items {
                put_reply(buf, item);
            }
        }
    }
}

/// Simple strings and errors can't carry line breaks
fn put_line(buf: &mut BytesMut, kind: u8, text: &str) {
    buf.put_u8(kind);
    for b in text.bytes() {
        buf.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
    }
    buf.put_slice(b"\r\n");
}

fn put_header(buf: &mut BytesMut, kind: u8, n: i64) {
    buf.put_u8(kind);
    buf.put_slice(n.to_string().as_bytes());
    buf.put_slice(b"\r\n");
}

fn put_bulk(buf: &mut BytesMut, bytes: &[u8]) {
    put_header(buf, b'$', bytes.len() as i64);
    buf.put_slice(bytes);
    buf.put_slice(b"\r\n");
}

/// Read one line without its terminator (`\r\n` or bare `\n`).
/// `Ok(None)` on EOF before any byte.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_INLINE_SIZE as u64 + 2)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        if line.len() > MAX_INLINE_SIZE {
            return Err(TallyError::protocol("Protocol error: too big inline request"));
        }
        return Err(TallyError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed mid-line",
        )));
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Read `$<len>\r\n<bytes>\r\n` inside a request array
fn read_bulk_arg<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let header = read_line(reader)?.ok_or_else(|| {
        TallyError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed mid-request",
        ))
    })?;

    if header.first() != Some(&b'$') {
        return Err(TallyError::protocol(format!(
            "Protocol error: expected '$', got '{}'",
            header.first().map_or(' ', |&b| b as char)
        )));
    }

    match parse_length(&header[1..])? {
        Some(len) => read_bulk_body(reader, len),
        None => Err(TallyError::protocol("Protocol error: invalid bulk length")),
    }
}

/// Read `len` bytes plus the trailing CRLF
fn read_bulk_body<R: BufRead>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    if len > MAX_BULK_SIZE {
        return Err(TallyError::protocol(format!(
            "Protocol error: bulk length {} exceeds {}",
            len, MAX_BULK_SIZE
        )));
    }

    let mut body = vec![0u8; len + 2];
    reader.read_exact(&mut body)?;
    if &body[len..] != b"\r\n" {
        return Err(TallyError::protocol("Protocol error: bulk string not terminated by CRLF"));
    }
    body.truncate(len);
    Ok(body)
}

fn parse_integer(digits: &[u8]) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            TallyError::protocol(format!(
                "Protocol error: invalid integer '{}'",
                String::from_utf8_lossy(digits)
            ))
        })
}

/// Length field; `-1` means null and maps to `None`
fn parse_length(digits: &[u8]) -> Result<Option<usize>> {
    match parse_integer(digits)? {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as usize)),
        n => Err(TallyError::protocol(format!(
            "Protocol error: invalid length {}",
            n
        ))),
    }
}
