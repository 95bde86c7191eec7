//! IncrBy / IncrByFloat
//!
//! `<cmd> key delta [CONSTRAINT type [criteria]]...`
//!
//! The delta and every clause are parsed before the store is touched.

use std::sync::Arc;

use crate::constraint::{self, Numeric};
use crate::error::Result;
use crate::protocol::Reply;
use crate::store::Store;

use super::{expect_min_args, CommandHandler};

/// Integer increment, replies with the new value
pub struct IncrByCommand {
    store: Arc<Store>,
}

impl IncrByCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for IncrByCommand {
    fn name(&self) -> &'static str {
        "IncrBy"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_min_args(self.name(), args, 2)?;
        let delta = i64::parse_arg(&args[1])?;
        let constraints = constraint::parse_clauses::<i64>(&args[2..])?;

        let value = self.store.incr_by(&args[0], delta, &constraints)?;
        Ok(Reply::Integer(value))
    }
}

/// Decimal increment, replies with the new value to four places
pub struct IncrByFloatCommand {
    store: Arc<Store>,
}

impl IncrByFloatCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for IncrByFloatCommand {
    fn name(&self) -> &'static str {
        "IncrByFloat"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_min_args(self.name(), args, 2)?;
        let delta = f64::parse_arg(&args[1])?;
        let constraints = constraint::parse_clauses::<f64>(&args[2..])?;

        let value = self.store.incr_by_float(&args[0], delta, &constraints)?;
        Ok(Reply::Simple(value.to_stored()))
    }
}
