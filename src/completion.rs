// Licensed under the Apache-2.0 license

//! Exactly-once completion signal between an interrupt handler and the
//! mainline.
//!
//! The interrupt handler is the only producer and the caller that armed the
//! transfer is the only consumer. The producer publishes with `Release`
//! ordering after its last write to the transfer descriptor; the consumer
//! observes with `Acquire`, so everything the handler wrote is visible once
//! the signal is seen.
//!
//! A `Completion` lives wherever both contexts can reach it, usually a
//! `static`, and is handed to the controller by reference:
//!
//! ```rust,ignore
//! static I2C_DONE: Completion = Completion::new();
//!
//! let controller = I2cController::new(hw, config, delay, &I2C_DONE);
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

use embedded_hal::delay::DelayNs;

use crate::common::PollBudget;

const IDLE: u8 = 0;
const ARMED: u8 = 1;
const SUCCEEDED: u8 = 2;
const FAILED: u8 = 3;

/// Observable state of a [`Completion`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompletionState {
    /// Never armed, or reset after the last result was consumed.
    Idle,
    /// A transfer is in flight.
    Armed,
    /// The last transfer finished without error.
    Succeeded,
    /// The last transfer finished with an error.
    Failed,
}

/// Returned by [`Completion::arm`] when a transfer is already in flight.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlreadyArmed;

/// Returned by [`Completion::wait`] when the budget ran out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WaitTimedOut;

pub struct Completion {
    state: AtomicU8,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl Completion {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Mark a transfer as in flight.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyArmed`] if the previous transfer has not completed.
    /// Two overlapping transfers would share one descriptor.
    pub fn arm(&self) -> Result<(), AlreadyArmed> {
        let current = self.state.load(Ordering::Acquire);
        if current == ARMED {
            return Err(AlreadyArmed);
        }
        self.state
            .compare_exchange(current, ARMED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| AlreadyArmed)
    }

    /// Publish the outcome of the in-flight transfer.
    ///
    /// Only the first call after [`arm`](Self::arm) has an effect; the return
    /// value tells whether this call was the one that completed the transfer.
    pub fn signal(&self, ok: bool) -> bool {
        let next = if ok { SUCCEEDED } else { FAILED };
        self.state
            .compare_exchange(ARMED, next, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    #[must_use]
    pub fn state(&self) -> CompletionState {
        match self.state.load(Ordering::Acquire) {
            ARMED => CompletionState::Armed,
            SUCCEEDED => CompletionState::Succeeded,
            FAILED => CompletionState::Failed,
            _ => CompletionState::Idle,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state() == CompletionState::Armed
    }

    /// `Some(ok)` once the armed transfer has finished.
    #[must_use]
    pub fn poll(&self) -> Option<bool> {
        match self.state() {
            CompletionState::Succeeded => Some(true),
            CompletionState::Failed => Some(false),
            CompletionState::Armed | CompletionState::Idle => None,
        }
    }

    /// Return to idle after the result has been consumed.
    pub fn reset(&self) {
        self.state.store(IDLE, Ordering::Release);
    }

    /// Wait for the interrupt handler to signal.
    ///
    /// Use this when the bus interrupt is routed to a handler that calls the
    /// controller's `handle_interrupt`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitTimedOut`] if `budget` is spent first. The transfer is
    /// still armed in that case and must be torn down by the owner.
    pub fn wait<D: DelayNs>(
        &self,
        delay: &mut D,
        budget: &mut PollBudget,
    ) -> Result<bool, WaitTimedOut> {
        loop {
            if let Some(ok) = self.poll() {
                return Ok(ok);
            }
            if !budget.idle(delay) {
                return self.poll().ok_or(WaitTimedOut);
            }
        }
    }
}
