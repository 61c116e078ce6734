//! Staged wake word pipeline.
//!
//! Each station runs in its own thread and drains one `StageBuffer`:
//! the spectral station reads samples, the embedding station reads mel
//! frames and fans out to one buffer per detector station. Shutdown marks
//! the sample buffer exhausted and exhaustion propagates stage by stage.

pub mod activation;
pub mod barrier;
pub mod detector_station;
pub mod embedding_station;
pub mod error;
pub mod orchestrator;
pub mod sink;
pub mod spectral_station;
pub mod stage_buffer;
pub mod station;
pub mod types;

pub use activation::{Activation, ActivationConfig, next_activation};
pub use barrier::ReadyBarrier;
pub use detector_station::DetectorStation;
pub use embedding_station::EmbeddingStation;
pub use error::{ErrorReporter, LogReporter, StationError};
pub use orchestrator::{Pipeline, PipelineHandle, PipelineSettings};
pub use sink::{ChannelSink, CollectorSink, EventSink, StdoutSink};
pub use spectral_station::SpectralStation;
pub use stage_buffer::StageBuffer;
pub use station::{Station, StationRunner};
pub use types::{Detection, DetectorEvent, PipelineReport, StationStats};
