//! Default configuration constants for wakeline.
//!
//! The geometry constants describe the tensors exchanged with the openWakeWord
//! family of models; the detection constants tune the activation automaton.

/// Audio sample rate in Hz expected by the spectral model.
pub const SAMPLE_RATE: u32 = 16000;

/// Samples per audio chunk (80 ms at 16 kHz).
pub const CHUNK_SAMPLES: usize = 1280;

/// Number of chunks handed to the spectral model per invocation.
///
/// Larger values lower per-call overhead at the cost of latency.
pub const STEP_FRAMES: usize = 4;

/// Mel bins per spectral time step.
pub const NUM_MELS: usize = 32;

/// Mel frames consumed per embedding invocation.
pub const EMB_WINDOW_SIZE: usize = 76;

/// Mel frames the embedding window advances by after each invocation.
pub const EMB_STEP_SIZE: usize = 8;

/// Length of one embedding vector.
pub const EMB_FEATURES: usize = 96;

/// Embedding vectors consumed per classifier invocation.
pub const WW_FEATURES: usize = 16;

/// Probability a classifier output must exceed to count as activation.
pub const THRESHOLD: f32 = 0.5;

/// Consecutive activations needed to emit a detection.
pub const TRIGGER_LEVEL: i32 = 4;

/// Steps a detector must cool down after emitting a detection.
pub const REFRACTORY: i32 = 20;

/// Spectral output is rescaled as `value / MEL_SCALE + MEL_OFFSET` to match
/// the embedding model's training range.
pub const MEL_SCALE: f32 = 10.0;

/// See [`MEL_SCALE`].
pub const MEL_OFFSET: f32 = 2.0;
