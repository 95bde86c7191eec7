//! `Scan cursor [PREFIX p] [WITH_REVERSE] [WITH_VALUE]`

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Reply;
use crate::scan::{self, ScanOptions};
use crate::store::Store;

use super::{expect_min_args, CommandHandler};

/// Replies with keys, or key / value pairs when `WITH_VALUE` is given
pub struct ScanCommand {
    store: Arc<Store>,
}

impl ScanCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl CommandHandler for ScanCommand {
    fn name(&self) -> &'static str {
        "Scan"
    }

    fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        expect_min_args(self.name(), args, 1)?;
        let options = ScanOptions::from_args(&args[1..])?;

        let items = self.store.scan(&args[0], &options)?;
        Ok(Reply::bulk_array(scan::flatten(items)))
    }
}
