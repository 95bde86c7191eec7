//! Store
//!
//! Lifecycle front over the engine: owns the engine and the key discard
//! task and exposes the data operations the commands run.
//!
//! ```text
//! Created ──start()──▶ Running ──stop()──▶ Stopped
//! ```
//!
//! Data operations only succeed while `Running`; otherwise they return
//! [`TallyError::Unavailable`] without touching the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::constraint::{self, Constraint, Numeric};
use crate::discard::KeyDiscardTask;
use crate::engine::{Engine, Entry};
use crate::error::{Result, TallyError};
use crate::expiration::{self, TtlStatus};
use crate::scan::{ScanItem, ScanIter, ScanOptions};

/// Store lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Opened, scheduler dormant, operations unavailable
    Created,
    /// Scheduler active, operations available
    Running,
    /// Scheduler cancelled, engine flushed; terminal
    Stopped,
}

/// The key-value store behind every command
pub struct Store {
    engine: Arc<Engine>,
    discard: KeyDiscardTask,

    /// Serializes start / stop
    lifecycle: Mutex<Lifecycle>,

    /// Fast path for data operations; mirrors `lifecycle == Running`
    running: AtomicBool,
}

impl Store {
    /// Validate the config and open the engine; the store starts dormant
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(Engine::open(config.clone())?);
        let discard = KeyDiscardTask::from_config(engine.clone(), &config);

        Ok(Self {
            engine,
            discard,
            lifecycle: Mutex::new(Lifecycle::Created),
            running: AtomicBool::new(false),
        })
    }

    /// Start the key discard task and accept operations.
    ///
    /// A second start is a no-op; starting a stopped store is an error.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lifecycle.lock();
        match *state {
            Lifecycle::Running => Ok(()),
            Lifecycle::Stopped => Err(TallyError::InvalidLifecycle(
                "store has been stopped and cannot be restarted".into(),
            )),
            Lifecycle::Created => {
                self.discard.start()?;
                *state = Lifecycle::Running;
                self.running.store(true, Ordering::Release);
                tracing::info!("Ready");
                Ok(())
            }
        }
    }

    /// Refuse further operations, cancel the key discard task and flush
    /// the engine. Stopping twice is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.lifecycle.lock();
        if *state == Lifecycle::Stopped {
            return Ok(());
        }

        tracing::info!("Stopping");
        self.running.store(false, Ordering::Release);
        *state = Lifecycle::Stopped;

        self.discard.stop();
        self.engine.close()?;

        tracing::info!("Stopped");
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    /// Whether data operations are accepted
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Underlying engine
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(TallyError::Unavailable)
        }
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Value for a key; `None` when absent or expired
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_running()?;
        self.engine
            .view(|txn| Ok(txn.get(key)?.map(|item| item.value)))
    }

    /// Overwrite or create a persistent entry
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_running()?;
        self.engine.update(|txn| {
            txn.set(key, value);
            Ok(())
        })
    }

    /// Remove a key; succeeds whether or not it existed
    pub fn del(&self, key: &[u8]) -> Result<()> {
        self.ensure_running()?;
        self.engine.update(|txn| {
            txn.delete(key);
            Ok(())
        })
    }

    /// Whether a live entry exists
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.ensure_running()?;
        self.engine.view(|txn| Ok(txn.get(key)?.is_some()))
    }

    /// Expire an existing key `lease_secs` from now; `false` when absent
    pub fn expire(&self, key: &[u8], lease_secs: i64) -> Result<bool> {
        self.ensure_running()?;
        self.engine.update(|txn| {
            let item = match txn.get(key)? {
                Some(item) => item,
                None => return Ok(false),
            };
            let at = expiration::expires_at(txn.now(), lease_secs);
            txn.set_entry(Entry::new(key, item.value).with_expires_at(at));
            Ok(true)
        })
    }

    /// Clear the expiry of an existing key; `false` when absent
    pub fn persist(&self, key: &[u8]) -> Result<bool> {
        self.ensure_running()?;
        self.engine.update(|txn| {
            let item = match txn.get(key)? {
                Some(item) => item,
                None => return Ok(false),
            };
            if item.expires_at != expiration::NO_EXPIRY {
                txn.set_entry(Entry::new(key, item.value));
            }
            Ok(true)
        })
    }

    /// Remaining lifetime of a key
    pub fn ttl(&self, key: &[u8]) -> Result<TtlStatus> {
        self.ensure_running()?;
        self.engine.view(|txn| {
            let expires_at = txn.get(key)?.map(|item| item.expires_at);
            Ok(TtlStatus::evaluate(expires_at, txn.now()))
        })
    }

    /// Atomically add `delta` to an integer value (absent = 0)
    pub fn incr_by(&self, key: &[u8], delta: i64, constraints: &[Constraint<i64>]) -> Result<i64> {
        self.increment(key, delta, constraints)
    }

    /// Atomically add `delta` to a decimal value (absent = 0), stored with
    /// four decimal places
    pub fn incr_by_float(
        &self,
        key: &[u8],
        delta: f64,
        constraints: &[Constraint<f64>],
    ) -> Result<f64> {
        self.increment(key, delta, constraints)
    }

    /// Keys (and optionally values) from `cursor` onward
    pub fn scan(&self, cursor: &[u8], options: &ScanOptions) -> Result<Vec<ScanItem>> {
        self.ensure_running()?;
        self.engine.view(|txn| {
            let iter = txn.iter(options.iterator_options());
            Ok(ScanIter::new(iter, cursor, options)?.collect())
        })
    }

    /// Read, add, check constraints and write back in one transaction.
    /// The written value never expires.
    fn increment<T: Numeric>(&self, key: &[u8], delta: T, constraints: &[Constraint<T>]) -> Result<T> {
        self.ensure_running()?;
        self.engine.update(|txn| {
            let current = match txn.get(key)? {
                Some(item) => T::parse_bytes(&item.value).ok_or_else(T::parse_error)?,
                None => T::ZERO,
            };

            let result = current.checked_add(delta).ok_or(TallyError::Overflow)?;
            constraint::check_all(constraints, result)?;

            txn.set(key, result.to_stored());
            Ok(result)
        })
    }
}
