//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls the shutdown signal)
//! - One thread per connection, bounded by `max_connections`
//! - Requests routed through the CommandTable
//! - On shutdown the acceptor stops, waits for in-flight requests to
//!   finish writing their replies, then returns

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
