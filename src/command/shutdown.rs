//! `Shutdown`: stop the store and ask the server to exit

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Reply;
use crate::store::Store;

use super::{expect_args, CommandHandler};

/// Shared flag the server polls to know it should wind down
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stops the store, then signals the server
pub struct ShutdownCommand {
    store: Arc<Store>,
    signal: ShutdownSignal,
}

impl ShutdownCommand {
    pub fn new(store: Arc<Store>, signal: ShutdownSignal) -> Self {
        Self { store, signal }
    }
}

impl CommandHandler for ShutdownCommand {
    fn name(&self) -> &'static str {
        "Shutdown"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 0)?;
        tracing::info!("shutdown requested by client");

        let stopped = self.store.stop();
        self.signal.trigger();
        stopped?;

        Ok(Reply::ok())
    }
}
