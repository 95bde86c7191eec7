//! Command Module
//!
//! Maps a request's command name to a handler object and turns the
//! handler's result into a reply.
//!
//! ## Dispatch
//! ```text
//! Request ──lowercase name──▶ CommandTable ──▶ CommandHandler::execute(args)
//!                                                   │
//!                                Ok(Reply) / Err(TallyError) ──▶ Reply
//! ```
//!
//! Handlers validate arity and argument shapes before touching the store,
//! so a rejected request never changes data.

mod keys;
mod expiry;
mod numeric;
mod scan;
mod shutdown;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TallyError};
use crate::protocol::{Reply, Request};
use crate::store::Store;

pub use expiry::{ExpireCommand, PersistCommand, TtlCommand};
pub use keys::{DelCommand, ExistsCommand, GetCommand, SetCommand};
pub use numeric::{IncrByCommand, IncrByFloatCommand};
pub use scan::ScanCommand;
pub use shutdown::{ShutdownCommand, ShutdownSignal};

/// One command implementation
pub trait CommandHandler: Send + Sync {
    /// Name used in error messages, e.g. `IncrBy`
    fn name(&self) -> &'static str;

    /// Run the command with the arguments that follow its name
    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply>;
}

/// Case-insensitive table of command handlers
pub struct CommandTable {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with every built-in command bound to `store`
    pub fn new(store: Arc<Store>, shutdown: ShutdownSignal) -> Self {
        let mut table = Self::empty();
        table.register(GetCommand::new(store.clone()));
        table.register(SetCommand::new(store.clone()));
        table.register(DelCommand::new(store.clone()));
        table.register(ExistsCommand::new(store.clone()));
        table.register(ExpireCommand::new(store.clone()));
        table.register(PersistCommand::new(store.clone()));
        table.register(TtlCommand::new(store.clone()));
        table.register(IncrByCommand::new(store.clone()));
        table.register(IncrByFloatCommand::new(store.clone()));
        table.register(ScanCommand::new(store.clone()));
        table.register(ShutdownCommand::new(store, shutdown));
        table
    }

    /// Add or replace a handler under its lowercased name
    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers
            .insert(handler.name().to_ascii_lowercase(), Box::new(handler));
    }

    /// Handler for a command name, ignoring case
    pub fn get(&self, name: &[u8]) -> Option<&dyn CommandHandler> {
        let key = String::from_utf8_lossy(name).to_ascii_lowercase();
        self.handlers.get(&key).map(|handler| handler.as_ref())
    }

    /// Registered command names (lowercase, unordered)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Execute a request; failures become error replies
    pub fn dispatch(&self, request: &Request) -> Reply {
        let handler = match self.get(&request.name) {
            Some(handler) => handler,
            None => {
                return Reply::Error(format!(
                    "ERR unknown command '{}'",
                    request.name_str()
                ))
            }
        };

        match handler.execute(&request.args) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(command = handler.name(), error = %e, "command failed");
                Reply::from_error(&e)
            }
        }
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

/// Exactly `count` arguments
fn expect_args(command: &str, args: &[Vec<u8>], count: usize) -> Result<()> {
    if args.len() == count {
        Ok(())
    } else {
        Err(TallyError::wrong_arity(command))
    }
}

/// At least `count` arguments
fn expect_min_args(command: &str, args: &[Vec<u8>], count: usize) -> Result<()> {
    if args.len() >= count {
        Ok(())
    } else {
        Err(TallyError::wrong_arity(command))
    }
}
