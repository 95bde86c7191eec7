//! Get / Set / Del / Exists

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Reply;
use crate::store::Store;

use super::{expect_args, CommandHandler};

/// `Get key` → bulk or null
pub struct GetCommand {
    store: Arc<Store>,
}

impl GetCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for GetCommand {
    fn name(&self) -> &'static str {
        "Get"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 1)?;
        Ok(Reply::optional_bulk(self.store.get(&args[0])?))
    }
}

/// `Set key value` → OK; clears any expiry
pub struct SetCommand {
    store: Arc<Store>,
}

impl SetCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for SetCommand {
    fn name(&self) -> &'static str {
        "Set"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 2)?;
        self.store.set(&args[0], &args[1])?;
        Ok(Reply::ok())
    }
}

/// `Del key` → 1, whether or not the key existed
pub struct DelCommand {
    store: Arc<Store>,
}

impl DelCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for DelCommand {
    fn name(&self) -> &'static str {
        "Del"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 1)?;
        self.store.del(&args[0])?;
        Ok(Reply::Integer(1))
    }
}

/// `Exists key` → 0 / 1
pub struct ExistsCommand {
    store: Arc<Store>,
}

impl ExistsCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for ExistsCommand {
    fn name(&self) -> &'static str {
        "Exists"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 1)?;
        Ok(Reply::boolean(self.store.exists(&args[0])?))
    }
}
