//! Startup barrier: the pipeline waits here until every station has loaded
//! its model.

use crate::error::{Result, WakelineError};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    failure: Option<WakelineError>,
}

/// Counter + condition shared by the pipeline and its stations.
#[derive(Debug, Default)]
pub struct ReadyBarrier {
    state: Mutex<BarrierState>,
    changed: Condvar,
}

impl ReadyBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that one station finished loading.
    pub fn arrive(&self) {
        self.lock().arrived += 1;
        self.changed.notify_all();
    }

    /// Record a load failure. The first failure wins; waiters are released.
    pub fn fail(&self, error: WakelineError) {
        let mut state = self.lock();
        if state.failure.is_none() {
            state.failure = Some(error);
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Block until `expected` stations arrived or one failed.
    pub fn wait(&self, expected: usize) -> Result<()> {
        let mut state = self
            .changed
            .wait_while(self.lock(), |s| {
                s.arrived < expected && s.failure.is_none()
            })
            .unwrap_or_else(PoisonError::into_inner);

        match state.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn arrived(&self) -> usize {
        self.lock().arrived
    }
}
