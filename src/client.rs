//! Blocking RESP client
//!
//! One request, one reply, over a single TCP connection. Used by the CLI
//! and the end-to-end tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, TallyError};
use crate::protocol::{read_reply, write_request, Reply, Request};
use crate::scan::ScanOptions;

/// Connection to a TallyKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| TallyError::Network(format!("failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Limit how long a reply may take (`None` = wait forever)
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send a request and return the raw reply, error replies included
    pub fn request(&mut self, request: &Request) -> Result<Reply> {
        write_request(&mut self.writer, request)?;
        read_reply(&mut self.reader)
    }

    /// Send a command by name; an error reply becomes `Err`
    pub fn command<I, A>(&mut self, name: &str, args: I) -> Result<Reply>
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        match self.request(&Request::new(name, args))? {
            Reply::Error(message) => Err(TallyError::Protocol(message)),
            reply => Ok(reply),
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.command("Get", [key])? {
            Reply::Bulk(value) => Ok(Some(value)),
            Reply::Null => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.command("Set", [key, value])? {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn del(&mut self, key: &[u8]) -> Result<()> {
        self.integer("Del", vec![key.to_vec()]).map(|_| ())
    }

    pub fn exists(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.integer("Exists", vec![key.to_vec()])? == 1)
    }

    pub fn expire(&mut self, key: &[u8], lease_secs: i64) -> Result<bool> {
        let args = vec![key.to_vec(), lease_secs.to_string().into_bytes()];
        Ok(self.integer("Expire", args)? == 1)
    }

    pub fn persist(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.integer("Persist", vec![key.to_vec()])? == 1)
    }

    /// -2 (no key), -1 (no expiry) or seconds left
    pub fn ttl(&mut self, key: &[u8]) -> Result<i64> {
        self.integer("Ttl", vec![key.to_vec()])
    }

    /// `constraints` are raw clause tokens, e.g. `["CONSTRAINT", "NON_NEGATIVE"]`
    pub fn incr_by(&mut self, key: &[u8], delta: i64, constraints: &[&str]) -> Result<i64> {
        let mut args = vec![key.to_vec(), delta.to_string().into_bytes()];
        args.extend(constraints.iter().map(|t| t.as_bytes().to_vec()));
        self.integer("IncrBy", args)
    }

    /// Returns the value as formatted by the server (four decimals)
    pub fn incr_by_float(&mut self, key: &[u8], delta: f64, constraints: &[&str]) -> Result<String> {
        let mut args = vec![key.to_vec(), delta.to_string().into_bytes()];
        args.extend(constraints.iter().map(|t| t.as_bytes().to_vec()));
        match self.command("IncrByFloat", args)? {
            Reply::Simple(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    /// Flat reply: keys, or key / value pairs when values are requested
    pub fn scan(&mut self, cursor: &[u8], options: &ScanOptions) -> Result<Vec<Vec<u8>>> {
        let mut args = vec![cursor.to_vec()];
        if !options.prefix.is_empty() {
            args.push(b"PREFIX".to_vec());
            args.push(options.prefix.clone());
        }
        if options.reverse {
            args.push(b"WITH_REVERSE".to_vec());
        }
        if options.include_values {
            args.push(b"WITH_VALUE".to_vec());
        }

        match self.command("Scan", args)? {
            Reply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Bulk(bytes) => Ok(bytes),
                    other => Err(unexpected(other)),
                })
                .collect(),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the server to stop
    pub fn shutdown(&mut self) -> Result<()> {
        match self.command("Shutdown", Vec::<Vec<u8>>::new())? {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn integer(&mut self, name: &str, args: Vec<Vec<u8>>) -> Result<i64> {
        match self.command(name, args)? {
            Reply::Integer(n) => Ok(n),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: Reply) -> TallyError {
    TallyError::protocol(format!("unexpected reply: {:?}", reply))
}
