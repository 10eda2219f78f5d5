//! Blocking primitives for the step lanes.
//!
//! Lock order: a worker enters the [`ExclusionGate`] of its phase before
//! taking a [`Semaphore`] permit. Permits are therefore only ever held by
//! steps that are allowed to run, and an exclusive step waiting for the
//! gate cannot be starved by permit holders blocked on that same gate.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    released: Condvar,
}

impl Semaphore {
    /// A semaphore with `permits` slots (at least one).
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a slot is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut permits = lock(&self.permits);
        while *permits == 0 {
            permits = self
                .released
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
        Permit { semaphore: self }
    }

    fn release(&self) {
        *lock(&self.permits) += 1;
        self.released.notify_one();
    }
}

/// Returns its slot on drop.
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[derive(Debug, Default)]
struct GateState {
    shared: usize,
    exclusive: bool,
    exclusive_waiting: usize,
}

/// Reader/writer gate between a phase's concurrent steps (shared) and its
/// exclusive steps.
///
/// Waiting exclusive steps block new shared entries.
#[derive(Debug, Default)]
pub struct ExclusionGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl ExclusionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter alongside other concurrent steps.
    pub fn shared(&self) -> GateGuard<'_> {
        let mut state = lock(&self.state);
        while state.exclusive || state.exclusive_waiting > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.shared += 1;
        GateGuard {
            gate: self,
            exclusive: false,
        }
    }

    /// Enter alone.
    pub fn exclusive(&self) -> GateGuard<'_> {
        let mut state = lock(&self.state);
        state.exclusive_waiting += 1;
        while state.exclusive || state.shared > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.exclusive_waiting -= 1;
        state.exclusive = true;
        GateGuard {
            gate: self,
            exclusive: true,
        }
    }

    fn leave(&self, exclusive: bool) {
        let mut state = lock(&self.state);
        if exclusive {
            state.exclusive = false;
        } else {
            state.shared -= 1;
        }
        drop(state);
        self.changed.notify_all();
    }
}

/// Leaves the gate on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a ExclusionGate,
    exclusive: bool,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.leave(self.exclusive);
    }
}
