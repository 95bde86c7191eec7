//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::command::{CommandTable, ShutdownSignal};
use crate::error::{Result, TallyError};
use crate::protocol::{read_request, write_reply, Reply};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Command handlers shared by all connections
    commands: Arc<CommandTable>,

    /// Stop serving once shutdown has been requested
    shutdown: ShutdownSignal,

    /// Server-wide count of requests awaiting their reply
    in_flight: Arc<AtomicUsize>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        commands: Arc<CommandTable>,
        shutdown: ShutdownSignal,
        in_flight: Arc<AtomicUsize>,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            commands,
            shutdown,
            in_flight,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve requests until the client disconnects, a protocol error
    /// occurs, or shutdown is requested
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        while !self.shutdown.is_triggered() {
            let request = match read_request(&mut self.reader) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::debug!(peer = %self.peer_addr, "client disconnected");
                    return Ok(());
                }
                Err(TallyError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "client went away");
                    return Ok(());
                }
                Err(TallyError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!(peer = %self.peer_addr, "read timeout");
                    return Ok(());
                }
                Err(e @ TallyError::Protocol(_)) => {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "protocol error");
                    let _ = write_reply(&mut self.writer, &Reply::from_error(&e));
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "read failed");
                    return Err(e);
                }
            };

            tracing::trace!(peer = %self.peer_addr, command = %request.name_str(), "request");

            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let reply = self.commands.dispatch(&request);
            let written = write_reply(&mut self.writer, &reply);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Err(e) = written {
                if let TallyError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(peer = %self.peer_addr, "client left before reply");
                        return Ok(());
                    }
                }
                tracing::warn!(peer = %self.peer_addr, error = %e, "write failed");
                return Err(e);
            }
        }

        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
