//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::command::{CommandTable, ShutdownSignal};
use crate::config::Config;
use crate::error::{Result, TallyError};
use crate::protocol::{encode_reply, Reply};
use crate::store::Store;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on waiting for in-flight requests at shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP server for TallyKV
pub struct Server {
    config: Config,
    store: Arc<Store>,
    commands: Arc<CommandTable>,
    listener: TcpListener,
    shutdown: ShutdownSignal,

    /// Open connections
    active_connections: Arc<AtomicUsize>,

    /// Requests dispatched whose reply has not been written yet
    in_flight: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TallyError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let shutdown = ShutdownSignal::new();
        let commands = Arc::new(CommandTable::new(store.clone(), shutdown.clone()));

        Ok(Self {
            config,
            store,
            commands,
            listener,
            shutdown,
            active_connections: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops `run` when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Number of open client connections
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Accept connections until shutdown is signalled (blocking).
    ///
    /// Returns after in-flight requests have been answered and the store
    /// has been stopped.
    pub fn run(&self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "listening");

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.accept(stream) {
                        tracing::warn!(%peer, error = %e, "failed to set up connection");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("shutting down, draining in-flight requests");
        self.drain();

        self.store.stop()?;
        tracing::info!("server stopped");
        Ok(())
    }

    fn accept(&self, mut stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        let active = self.active_connections.fetch_add(1, Ordering::SeqCst) + 1;
        if active > self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(max = self.config.max_connections, "connection limit reached");
            let reply = Reply::Error("ERR max number of clients reached".into());
            let _ = stream.write_all(&encode_reply(&reply));
            return Ok(());
        }

        let guard = ConnectionGuard(self.active_connections.clone());
        let mut connection = Connection::new(
            stream,
            self.commands.clone(),
            self.shutdown.clone(),
            self.in_flight.clone(),
        )?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        thread::Builder::new()
            .name("tallykv-conn".into())
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = connection.handle() {
                    tracing::debug!(peer = connection.peer_addr(), error = %e, "connection closed with error");
                }
            })?;

        Ok(())
    }

    /// Wait until no request is mid-flight, or the drain timeout passes
    fn drain(&self) {
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                tracing::warn!(
                    in_flight = self.in_flight.load(Ordering::SeqCst),
                    "drain timed out"
                );
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Releases a connection slot when the connection thread ends
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
