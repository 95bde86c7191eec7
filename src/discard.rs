//! Key Discard Scheduler
//!
//! A background thread that periodically asks the engine to reclaim space
//! held by deleted, superseded and expired entries.
//!
//! ```text
//!   start() ──▶ thread: loop select! {
//!                 recv(cancel) ─▶ exit
//!                 recv(tick)   ─▶ reclaim(ratio), log outcome
//!               }
//!   stop()  ──▶ signal cancel, join thread
//! ```
//!
//! Reclamation errors are logged and never stop the loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TallyError};
use crate::storage::ReclaimStats;

/// Something that can reclaim space on demand
pub trait Reclaim: Send + Sync + 'static {
    /// Reclaim when at least `ratio` of stored entries are dead
    fn reclaim(&self, ratio: f64) -> Result<ReclaimStats>;
}

impl Reclaim for Engine {
    fn reclaim(&self, ratio: f64) -> Result<ReclaimStats> {
        Engine::reclaim(self, ratio)
    }
}

#[derive(Default)]
struct TaskState {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

/// Handle to the periodic reclamation thread
pub struct KeyDiscardTask {
    target: Arc<dyn Reclaim>,
    interval: Duration,
    ratio: f64,
    state: Mutex<TaskState>,
}

impl KeyDiscardTask {
    /// Create a dormant task
    pub fn new(target: Arc<dyn Reclaim>, interval: Duration, ratio: f64) -> Self {
        Self {
            target,
            interval,
            ratio,
            state: Mutex::new(TaskState::default()),
        }
    }

    /// Create a dormant task using the configured interval and ratio
    pub fn from_config(target: Arc<dyn Reclaim>, config: &Config) -> Self {
        Self::new(target, config.key_discard_interval, config.key_discard_ratio)
    }

    /// Spawn the background thread. Starting a running task is a no-op;
    /// a stopped task cannot be started again.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.stopped {
            return Err(TallyError::InvalidLifecycle(
                "key discard task already stopped".into(),
            ));
        }
        if state.handle.is_some() {
            return Ok(());
        }

        let (cancel_tx, cancel_rx) = channel::bounded::<()>(1);
        let target = Arc::clone(&self.target);
        let interval = self.interval;
        let ratio = self.ratio;

        let handle = thread::Builder::new()
            .name("key-discard".into())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    channel::select! {
                        recv(cancel_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            // Both may be ready at once; cancellation wins
                            if !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty)) {
                                break;
                            }
                            run_once(target.as_ref(), ratio);
                        }
                    }
                }
                tracing::debug!("key discard task exited");
            })?;

        tracing::info!(interval_secs = interval.as_secs_f64(), ratio, "key discard task started");

        state.cancel = Some(cancel_tx);
        state.handle = Some(handle);
        Ok(())
    }

    /// Cancel future ticks and wait for an in-flight reclamation to finish.
    /// Safe to call any number of times.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;

        // Dropping the sender disconnects the channel even if the send fails
        if let Some(cancel) = state.cancel.take() {
            let _ = cancel.try_send(());
        }
        if let Some(handle) = state.handle.take() {
            if handle.join().is_err() {
                tracing::error!("key discard task panicked");
            }
            tracing::info!("key discard task stopped");
        }
    }

    /// Whether the background thread is running
    pub fn is_running(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Configured tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Configured discard ratio
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Drop for KeyDiscardTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One reclamation attempt; outcome is logged only
fn run_once(target: &dyn Reclaim, ratio: f64) {
    match target.reclaim(ratio) {
        Ok(stats) => tracing::info!(
            entries_before = stats.entries_before,
            entries_after = stats.entries_after,
            discard_ratio = stats.discard_ratio,
            "reclaimed space"
        ),
        Err(TallyError::NoRewrite) => tracing::debug!("nothing to reclaim"),
        Err(e) => tracing::warn!(error = %e, "reclaim failed"),
    }
}
