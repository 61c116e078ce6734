//! Station failures and where they get reported.

use crate::error::WakelineError;
use thiserror::Error;
use tracing::{error, warn};

/// Outcome of a failed `Station::process` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    /// The window is dropped and the station keeps draining.
    #[error("{0} (window skipped)")]
    Recoverable(String),
    /// The station stops and marks its outputs exhausted.
    #[error("{0} (station stopped)")]
    Fatal(String),
}

impl StationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StationError::Fatal(_))
    }
}

impl From<WakelineError> for StationError {
    /// Inference and model errors end the station; there is no retry.
    fn from(error: WakelineError) -> Self {
        StationError::Fatal(error.to_string())
    }
}

/// Receives every station failure, on the failing station's thread.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, station: &str, error: &StationError);
}

/// Forwards failures to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, err: &StationError) {
        if err.is_fatal() {
            error!(station, "{}", err);
        } else {
            warn!(station, "{}", err);
        }
    }
}
