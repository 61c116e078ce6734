use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// The three model roles a pipeline loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Raw audio → mel spectrogram frames.
    Spectral,
    /// Window of mel frames → one embedding vector.
    Embedding,
    /// Window of embedding vectors → wake word probability.
    Classifier,
}

/// Identifies a model to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    pub kind: ModelKind,
    /// Model identifier. For classifiers this is the wake word name.
    pub name: String,
}

impl ModelSpec {
    pub fn spectral() -> Self {
        Self {
            kind: ModelKind::Spectral,
            name: "melspectrogram".to_string(),
        }
    }

    pub fn embedding() -> Self {
        Self {
            kind: ModelKind::Embedding,
            name: "embedding".to_string(),
        }
    }

    pub fn classifier(wake_word: &str) -> Self {
        Self {
            kind: ModelKind::Classifier,
            name: wake_word.to_string(),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ModelKind::Spectral | ModelKind::Embedding => write!(f, "{}", self.name),
            ModelKind::Classifier => write!(f, "classifier:{}", self.name),
        }
    }
}

/// Threading options handed to the engine when a model is loaded.
///
/// Every pipeline worker already runs on its own thread, so models default to
/// single-threaded execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub intra_threads: usize,
    pub inter_threads: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_threads: 1,
            inter_threads: 1,
        }
    }
}

/// A loaded model: a deterministic function from one input tensor to a flat
/// output tensor.
pub trait Transform: Send {
    /// Run the model on `input`, laid out row-major with dimensions `shape`.
    fn run(&mut self, input: &[f32], shape: &[usize]) -> Result<Vec<f32>>;
}

/// Trait for the inference backend that owns model formats and execution.
///
/// This trait allows swapping implementations (ONNX runtime, tract, mock).
/// `load` is called from the worker thread that will run the model.
pub trait InferenceEngine: Send + Sync {
    fn load(&self, spec: &ModelSpec, options: &SessionOptions) -> Result<Box<dyn Transform>>;
}

impl<T: InferenceEngine + ?Sized> InferenceEngine for Arc<T> {
    fn load(&self, spec: &ModelSpec, options: &SessionOptions) -> Result<Box<dyn Transform>> {
        (**self).load(spec, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_spec_display() {
        assert_eq!(ModelSpec::spectral().to_string(), "melspectrogram");
        assert_eq!(ModelSpec::embedding().to_string(), "embedding");
        assert_eq!(
            ModelSpec::classifier("hey_jarvis").to_string(),
            "classifier:hey_jarvis"
        );
    }

    #[test]
    fn test_session_options_default_single_threaded() {
        let options = SessionOptions::default();
        assert_eq!(options.intra_threads, 1);
        assert_eq!(options.inter_threads, 1);
    }

    #[test]
    fn inference_engine_is_object_safe() {
        let _engine: Arc<dyn InferenceEngine> = Arc::new(crate::inference::MockEngine::new());
    }
}
