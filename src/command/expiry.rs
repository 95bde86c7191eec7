//! Expire / Persist / Ttl

use std::sync::Arc;

use crate::constraint::Numeric;
use crate::error::Result;
use crate::protocol::Reply;
use crate::store::Store;

use super::{expect_args, CommandHandler};

/// `Expire key leaseSeconds` → 1 when the key exists, else 0
pub struct ExpireCommand {
    store: Arc<Store>,
}

impl ExpireCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for ExpireCommand {
    fn name(&self) -> &'static str {
        "Expire"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 2)?;
        let lease = i64::parse_arg(&args[1])?;
        Ok(Reply::boolean(self.store.expire(&args[0], lease)?))
    }
}

/// `Persist key` → 1 when the key exists, else 0
pub struct PersistCommand {
    store: Arc<Store>,
}

impl PersistCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for PersistCommand {
    fn name(&self) -> &'static str {
        "Persist"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 1)?;
        Ok(Reply::boolean(self.store.persist(&args[0])?))
    }
}

/// `Ttl key` → -2 (no key), -1 (no expiry) or seconds left
pub struct TtlCommand {
    store: Arc<Store>,
}

impl TtlCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for TtlCommand {
    fn name(&self) -> &'static str {
        "Ttl"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_args(self.name(), args, 1)?;
        Ok(Reply::Integer(self.store.ttl(&args[0])?.code()))
    }
}
