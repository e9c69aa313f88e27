//! Active Expiration Sweeper
//!
//! Background thread that periodically removes expired cache entries so keys
//! that are never read again still get reclaimed.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

// == Sweeper State ==
/// Lifecycle of the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Active sweeping is turned off; only lazy expiration applies
    Disabled,
    /// Waiting for the next tick
    Idle,
    /// Performing a sweep pass
    Running,
    /// Shut down; terminal
    Stopped,
}

impl SweeperState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Disabled,
            1 => Self::Idle,
            2 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SweeperState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> SweeperState {
        SweeperState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: SweeperState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// == Sweeper ==
/// Handle to the background sweeper thread.
///
/// [`Sweeper::stop`] signals the thread and joins it; dropping the handle
/// does the same.
#[derive(Debug)]
pub struct Sweeper {
    /// Cancellation channel; a message or a disconnect ends the loop
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    state: Arc<StateCell>,
}

impl Sweeper {
    /// Spawns a sweeper that calls `sweep` every `interval`.
    ///
    /// `sweep` returns the number of keys removed, or None when the pass was
    /// skipped because the store was busy. A zero interval yields a disabled
    /// sweeper with no thread.
    pub fn spawn<F>(interval: Duration, mut sweep: F) -> Self
    where
        F: FnMut() -> Option<usize> + Send + 'static,
    {
        if interval.is_zero() {
            info!("Active expiration disabled; relying on lazy expiration");
            return Self {
                shutdown_tx: None,
                handle: None,
                state: Arc::new(StateCell::new(SweeperState::Disabled)),
            };
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let state = Arc::new(StateCell::new(SweeperState::Idle));
        let thread_state = Arc::clone(&state);

        let spawned = thread::Builder::new()
            .name("mem-cache-sweeper".to_string())
            .spawn(move || {
                info!(
                    interval_ms = interval.as_millis() as u64,
                    "Starting expiration sweeper"
                );

                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    thread_state.set(SweeperState::Running);
                    match sweep() {
                        Some(0) => debug!("Sweep: no expired entries found"),
                        Some(removed) => debug!(removed, "Sweep: removed expired entries"),
                        None => debug!("Sweep skipped: store busy"),
                    }
                    thread_state.set(SweeperState::Idle);
                }

                thread_state.set(SweeperState::Stopped);
                info!("Expiration sweeper stopped");
            });

        match spawned {
            Ok(handle) => Self {
                shutdown_tx: Some(shutdown_tx),
                handle: Some(handle),
                state,
            },
            Err(err) => {
                warn!(error = %err, "Failed to spawn expiration sweeper; relying on lazy expiration");
                state.set(SweeperState::Disabled);
                Self {
                    shutdown_tx: None,
                    handle: None,
                    state,
                }
            }
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SweeperState {
        self.state.get()
    }

    /// Signals the thread to exit and waits for it. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Expiration sweeper panicked");
            }
        }

        self.state.set(SweeperState::Stopped);
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
