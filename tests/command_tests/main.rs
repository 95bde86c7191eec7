//! Command dispatch test suite


use std::sync::Arc;

use tallykv::command::ShutdownSignal;
use tallykv::config::{Config, EngineKind};
use tallykv::protocol::{Reply, Request};
use tallykv::{CommandTable, Store};

pub struct Harness {
    pub store: Arc<Store>,
    pub signal: ShutdownSignal,
    pub table: CommandTable,
}

impl Harness {
    pub fn new() -> Self {
        let config = Config::builder().engine(EngineKind::Memory).build();
        let store = Arc::new(Store::open(config).unwrap());
        store.start().unwrap();
        let signal = ShutdownSignal::new();
        let table = CommandTable::new(store.clone(), signal.clone());
        Self {
            store,
            signal,
            table,
        }
    }

    /// Dispatch a command given as whitespace separated words
    pub fn run(&self, line: &str) -> Reply {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap();
        self.table.dispatch(&Request::new(name, words))
    }
}

pub fn bulk(s: &str) -> Reply {
    Reply::Bulk(s.as_bytes().to_vec())
}

pub fn error(s: &str) -> Reply {
    Reply::Error(s.to_string())
}
