//! Seam to the external inference engine that runs the three models.

pub mod engine;
pub mod mock;

pub use engine::{InferenceEngine, ModelKind, ModelSpec, SessionOptions, Transform};
pub use mock::MockEngine;
