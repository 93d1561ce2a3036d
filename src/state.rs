// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Carver state
//!
//! A carver is either idle (`Std`), busy with one of the long
//! operations, or `Cancelled`.  Transitions go through a fair mutex,
//! so callers racing for it are served in arrival order.  Cancellation
//! is also mirrored into an atomic flag that the inner loops poll.

use crate::error::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarverState {
    Std,
    Resizing,
    Inflating,
    Transposing,
    Flattening,
    Cancelled,
}

impl CarverState {
    /// True for the states a cancellation can interrupt.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            CarverState::Resizing
                | CarverState::Inflating
                | CarverState::Transposing
                | CarverState::Flattening
        )
    }
}

#[derive(Debug)]
pub(crate) struct StateCell {
    state: Mutex<CarverState>,
    cancelled: AtomicBool,
}

impl Default for StateCell {
    fn default() -> Self {
        StateCell::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        StateCell {
            state: Mutex::new(CarverState::Std),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> CarverState {
        *self.state.lock()
    }

    fn store(&self, mut guard: MutexGuard<'_, CarverState>, next: CarverState) {
        *guard = next;
        self.cancelled.store(next == CarverState::Cancelled, Ordering::Release);
        MutexGuard::unlock_fair(guard);
    }

    /// Enter `next` from `Std`, or fail if something else is running.
    pub fn begin(&self, next: CarverState) -> Result<()> {
        let guard = self.state.lock();
        if *guard != CarverState::Std {
            return Err(Error::OperationInProgress);
        }
        self.store(guard, next);
        Ok(())
    }

    /// Switch to `next`, unless a cancellation is pending and `next` is
    /// not `Std`.
    pub fn set(&self, next: CarverState) {
        let guard = self.state.lock();
        if *guard == CarverState::Cancelled && next != CarverState::Std {
            return;
        }
        self.store(guard, next);
    }

    /// Request cancellation.  Only acts on a busy carver.
    pub fn cancel(&self) -> bool {
        let guard = self.state.lock();
        if !guard.is_active() {
            return false;
        }
        self.store(guard, CarverState::Cancelled);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Polled by the long loops.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A handle that can cancel a carver's running operation from another
/// thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(pub(crate) Arc<StateCell>);

impl CancelHandle {
    /// Ask the running operation to stop at its next checkpoint.
    /// Returns false, and does nothing, if the carver is idle.
    pub fn cancel(&self) -> bool {
        self.0.cancel()
    }

    pub fn state(&self) -> CarverState {
        self.0.get()
    }
}
