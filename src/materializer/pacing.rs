//! Cancellable pacing between file writes.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag that interrupts a run at its next pause or file boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Blocks for `duration` or until cancelled. Returns whether the token
    /// was cancelled.
    ///
    /// A duration too large to express as a deadline waits until cancelled.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .signal
                        .wait_until(&mut cancelled, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
                None => self.inner.signal.wait(&mut cancelled),
            }
        }
        *cancelled
    }
}

pub(crate) struct Pacer {
    delay: Duration,
    token: CancelToken,
    pauses: u64,
}

impl Pacer {
    pub(crate) fn new(delay: Duration, token: CancelToken) -> Self {
        Pacer {
            delay,
            token,
            pauses: 0,
        }
    }

    /// Waits out the configured delay. A zero delay never waits.
    /// Returns `true` if the run should stop.
    pub(crate) fn pause(&mut self) -> bool {
        if self.delay.is_zero() {
            return self.token.is_cancelled();
        }
        self.pauses += 1;
        self.token.wait(self.delay)
    }

    pub(crate) fn pauses(&self) -> u64 {
        self.pauses
    }
}
