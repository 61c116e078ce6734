//! Synchronized hand-off buffer between pipeline stations.
//!
//! A `StageBuffer` is an unbounded FIFO of `f32` values with a "ready" signal
//! and a one-way "exhausted" flag. Producers `push` and never wait; the single
//! consumer blocks in `drain_wait` until data arrives or the producer side is
//! exhausted. The buffer knows nothing about transform-input units: consumers
//! drain everything and keep partial units on their side.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BufferState {
    values: Vec<f32>,
    ready: bool,
    exhausted: bool,
}

/// Producer/consumer queue guarded by one mutex/condvar pair.
#[derive(Debug, Default)]
pub struct StageBuffer {
    state: Mutex<BufferState>,
    ready: Condvar,
}

impl StageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    // State is consistent between statements, so a panic elsewhere never
    // leaves it half-updated.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append values at the tail and wake the consumer.
    ///
    /// Never blocks beyond the critical section. There is no capacity limit:
    /// a consumer that falls behind grows the buffer.
    pub fn push(&self, values: &[f32]) {
        if values.is_empty() {
            return;
        }
        let mut state = self.lock();
        state.values.extend_from_slice(values);
        state.ready = true;
        drop(state);
        self.ready.notify_one();
    }

    /// Block until data is ready, then take everything buffered.
    ///
    /// Returns `None` once the buffer is exhausted and empty: the producer
    /// is gone and nothing further will arrive.
    pub fn drain_wait(&self) -> Option<Vec<f32>> {
        let mut state = self
            .ready
            .wait_while(self.lock(), |s| {
                !s.ready && !(s.exhausted && s.values.is_empty())
            })
            .unwrap_or_else(PoisonError::into_inner);

        if state.exhausted && state.values.is_empty() {
            return None;
        }

        let values = std::mem::take(&mut state.values);
        if !state.exhausted {
            state.ready = false;
        }
        Some(values)
    }

    /// Signal that no more values will be pushed. Idempotent.
    pub fn mark_exhausted(&self) {
        let mut state = self.lock();
        state.exhausted = true;
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().exhausted
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
