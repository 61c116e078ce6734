//! Core station abstraction and runner for the wake word pipeline.

use crate::error::{Result, WakelineError};
use crate::pipeline::barrier::ReadyBarrier;
use crate::pipeline::error::{ErrorReporter, StationError};
use crate::pipeline::stage_buffer::StageBuffer;
use crate::pipeline::types::StationStats;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// A processing station in the pipeline.
///
/// A station consumes fixed-size windows from one input buffer. After each
/// window the runner advances the pending input by `step_len` values, so
/// consecutive windows overlap by `window_len - step_len`.
pub trait Station: Send + 'static {
    /// Returns the name of this station for logging and error reporting.
    fn name(&self) -> String;

    /// Loads the station's model. Runs on the station's own thread before
    /// any input is consumed.
    fn load(&mut self) -> Result<()>;

    /// Values consumed per `process` call.
    fn window_len(&self) -> usize;

    /// Values removed from the front of the pending input after each call.
    fn step_len(&self) -> usize;

    /// Processes one window of exactly `window_len` values.
    fn process(&mut self, window: &[f32]) -> std::result::Result<(), StationError>;

    /// Called when the station is shutting down, whatever the reason.
    ///
    /// Stations mark their output buffers exhausted here so that downstream
    /// stations terminate too.
    fn shutdown(&mut self) {}
}

/// Runs a station in a dedicated thread.
pub struct StationRunner {
    /// Handle to the spawned thread.
    handle: Option<JoinHandle<StationStats>>,
    /// Name of the station (cached for error reporting).
    station_name: String,
}

impl StationRunner {
    /// Spawns a new station in a dedicated thread.
    ///
    /// # Arguments
    /// * `station` - The station implementation to run
    /// * `input` - Buffer the station drains
    /// * `barrier` - Startup barrier; the station arrives after loading
    /// * `error_reporter` - Reporter for handling errors
    pub fn spawn<S: Station>(
        mut station: S,
        input: Arc<StageBuffer>,
        barrier: Arc<ReadyBarrier>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let station_name = station.name();

        let thread_name = station_name.clone();
        let handle = thread::Builder::new()
            .name(format!("wakeline-{}", station_name))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    Self::run_station(&mut station, &input, &barrier, error_reporter.as_ref())
                }));

                match outcome {
                    Ok(stats) => stats,
                    Err(payload) => {
                        // Release `start` and the downstream stations before
                        // the panic reaches `join`
                        let message = panic_message(payload.as_ref());
                        error_reporter.report(
                            &thread_name,
                            &StationError::Fatal(format!("panicked: {}", message)),
                        );
                        barrier.fail(WakelineError::WorkerPanicked {
                            worker: thread_name,
                            message,
                        });
                        station.shutdown();
                        panic::resume_unwind(payload)
                    }
                }
            })?;

        Ok(Self {
            handle: Some(handle),
            station_name,
        })
    }

    /// Main processing loop for the station.
    fn run_station<S: Station>(
        station: &mut S,
        input: &StageBuffer,
        barrier: &ReadyBarrier,
        error_reporter: &dyn ErrorReporter,
    ) -> StationStats {
        let station_name = station.name();
        let mut stats = StationStats {
            name: station_name.clone(),
            windows: 0,
            leftover: 0,
            failed: false,
        };

        if let Err(e) = station.load() {
            error_reporter.report(&station_name, &StationError::Fatal(e.to_string()));
            barrier.fail(e);
            stats.failed = true;
            station.shutdown();
            return stats;
        }
        info!(station = %station_name, "model loaded");
        barrier.arrive();

        let window_len = station.window_len();
        let step_len = station.step_len();
        let mut pending: Vec<f32> = Vec::new();

        'drain: while let Some(values) = input.drain_wait() {
            pending.extend_from_slice(&values);

            while pending.len() >= window_len {
                match station.process(&pending[..window_len]) {
                    Ok(()) => {}
                    Err(StationError::Recoverable(msg)) => {
                        // Report, drop this window and carry on
                        error_reporter.report(&station_name, &StationError::Recoverable(msg));
                    }
                    Err(StationError::Fatal(msg)) => {
                        error_reporter.report(&station_name, &StationError::Fatal(msg));
                        stats.failed = true;
                        break 'drain;
                    }
                }
                stats.windows += 1;
                pending.drain(..step_len);
            }
        }

        stats.leftover = pending.len();
        debug!(
            station = %station_name,
            windows = stats.windows,
            leftover = stats.leftover,
            "station drained"
        );

        // Cleanup on shutdown
        station.shutdown();
        stats
    }

    /// Waits for the station thread to complete and returns its stats.
    pub fn join(mut self) -> Result<StationStats> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|payload| WakelineError::WorkerPanicked {
                    worker: self.station_name.clone(),
                    message: panic_message(payload.as_ref()),
                }),
            None => Err(WakelineError::Pipeline {
                message: format!("station '{}' already joined", self.station_name),
            }),
        }
    }

    /// Returns the name of the station.
    pub fn name(&self) -> &str {
        &self.station_name
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
        .to_string()
}
