//! Render admission control.
//!
//! The pipeline is single-threaded and stateless per call; the one thing
//! worth bounding is how many renders run at once, since each allocates a
//! scaled raster canvas. Callers that fan out concurrent requests take a
//! permit before rendering. Acquisition honors a deadline, so a saturated
//! pool turns into a cancellation error instead of an unbounded wait.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("render permit not granted before the deadline")]
    Cancelled,
}

/// Fixed-size pool of render permits.
#[derive(Debug)]
pub struct RenderGate {
    available: Mutex<usize>,
    signal: Condvar,
}

impl RenderGate {
    /// Create a gate admitting at most `permits` concurrent renders.
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits.max(1)),
            signal: Condvar::new(),
        }
    }

    /// Take a permit, waiting until one frees up or `deadline` passes.
    ///
    /// With no deadline the call waits indefinitely. The permit is released
    /// when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Cancelled`] once `deadline` passes without a
    /// permit becoming available.
    pub fn acquire(&self, deadline: Option<Instant>) -> Result<Permit<'_>, GateError> {
        let mut available = lock_recovering(&self.available);
        loop {
            if *available > 0 {
                *available -= 1;
                return Ok(Permit { gate: self });
            }
            match deadline {
                None => {
                    available = self
                        .signal
                        .wait(available)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(GateError::Cancelled);
                    }
                    let (guard, _timed_out) = self
                        .signal
                        .wait_timeout(available, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    available = guard;
                }
            }
        }
    }

    fn release(&self) {
        let mut available = lock_recovering(&self.available);
        *available += 1;
        drop(available);
        self.signal.notify_one();
    }
}

fn lock_recovering(mutex: &Mutex<usize>) -> MutexGuard<'_, usize> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII render permit; dropping it readmits the next waiter.
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a RenderGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
