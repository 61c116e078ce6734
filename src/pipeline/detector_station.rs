//! Detector station: one per wake word. Classifies a single-step sliding
//! window of embedding vectors and debounces the probabilities.

use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::{InferenceEngine, ModelSpec, SessionOptions, Transform};
use crate::pipeline::activation::{Activation, ActivationConfig};
use crate::pipeline::error::StationError;
use crate::pipeline::sink::SharedSink;
use crate::pipeline::station::Station;
use crate::pipeline::types::{Detection, DetectorEvent};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DetectorStation {
    engine: Arc<dyn InferenceEngine>,
    options: SessionOptions,
    model: Option<Box<dyn Transform>>,
    wake_word: String,
    index: usize,
    window_vectors: usize,
    features: usize,
    activation: Activation,
    debug: bool,
    step: u64,
    sink: SharedSink,
}

impl DetectorStation {
    pub(crate) fn new(
        engine: Arc<dyn InferenceEngine>,
        wake_word: &str,
        index: usize,
        sink: SharedSink,
    ) -> Self {
        Self {
            engine,
            options: SessionOptions::default(),
            model: None,
            wake_word: wake_word.to_string(),
            index,
            window_vectors: defaults::WW_FEATURES,
            features: defaults::EMB_FEATURES,
            activation: Activation::new(ActivationConfig::default()),
            debug: false,
            step: 0,
            sink,
        }
    }

    /// Embedding vectors per classifier window, and values per vector.
    pub fn with_window(mut self, window_vectors: usize, features: usize) -> Self {
        self.window_vectors = window_vectors;
        self.features = features;
        self
    }

    pub fn with_activation(mut self, config: ActivationConfig) -> Self {
        self.activation = Activation::new(config);
        self
    }

    /// Emit every raw probability as a `DetectorEvent::Probability`.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

impl Station for DetectorStation {
    fn name(&self) -> String {
        format!("detector:{}", self.wake_word)
    }

    fn load(&mut self) -> Result<()> {
        let spec = ModelSpec::classifier(&self.wake_word);
        self.model = Some(self.engine.load(&spec, &self.options)?);
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.window_vectors * self.features
    }

    // Advance one vector: the classifier runs once per incoming embedding
    fn step_len(&self) -> usize {
        self.features
    }

    fn process(&mut self, window: &[f32]) -> std::result::Result<(), StationError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| StationError::Fatal("classifier model not loaded".to_string()))?;

        // [1, window_vectors, features] → [1, outputs]
        let probabilities = model.run(window, &[1, self.window_vectors, self.features])?;
        if probabilities.is_empty() {
            return Err(WakelineError::Inference {
                station: self.name(),
                message: "classifier returned no probabilities".to_string(),
            }
            .into());
        }

        let step = self.step;
        self.step += 1;

        let mut sink_error = None;
        for probability in probabilities {
            if self.debug {
                debug!(wake_word = %self.wake_word, step, probability, "classifier output");
                let event = DetectorEvent::Probability {
                    wake_word: self.wake_word.clone(),
                    step,
                    probability,
                };
                if let Err(e) = self.sink.emit(&event) {
                    sink_error.get_or_insert(e);
                }
            }

            if self.activation.update(probability) {
                info!(wake_word = %self.wake_word, step, probability, "wake word detected");
                let event = DetectorEvent::Detected(Detection {
                    wake_word: self.wake_word.clone(),
                    detector: self.index,
                    step,
                    probability,
                });
                if let Err(e) = self.sink.emit(&event) {
                    sink_error.get_or_insert(e);
                }
            }
        }

        match sink_error {
            Some(e) => Err(StationError::Recoverable(format!("event sink: {}", e))),
            None => Ok(()),
        }
    }
}
