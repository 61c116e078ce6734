//! Data types emitted by the wake word pipeline.

/// A debounced wake word detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Wake word (classifier model) identifier.
    pub wake_word: String,
    /// Position of the detector in the configured wake word list.
    pub detector: usize,
    /// Classifier step at which the trigger fired, counted from zero per
    /// detector. One step per incoming embedding vector.
    pub step: u64,
    /// Probability that completed the trigger.
    pub probability: f32,
}

/// Events produced by detector stations.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorEvent {
    /// Trigger level reached.
    Detected(Detection),
    /// Raw classifier output, only produced in debug mode.
    Probability {
        wake_word: String,
        step: u64,
        probability: f32,
    },
}

impl DetectorEvent {
    pub fn wake_word(&self) -> &str {
        match self {
            DetectorEvent::Detected(detection) => &detection.wake_word,
            DetectorEvent::Probability { wake_word, .. } => wake_word,
        }
    }

    pub fn as_detection(&self) -> Option<&Detection> {
        match self {
            DetectorEvent::Detected(detection) => Some(detection),
            DetectorEvent::Probability { .. } => None,
        }
    }
}

/// Work done by one station over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationStats {
    pub name: String,
    /// Number of transform invocations.
    pub windows: u64,
    /// Values left over in the pending sequence at termination (less than one
    /// window).
    pub leftover: usize,
    /// Whether the station stopped on a fatal error.
    pub failed: bool,
}

/// Summary returned by a drained pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stations: Vec<StationStats>,
    pub detections: u64,
}

impl PipelineReport {
    /// Stats for the station with the given name.
    pub fn station(&self, name: &str) -> Option<&StationStats> {
        self.stations.iter().find(|s| s.name == name)
    }
}
