//! Scripted inference engine for tests and benchmarks.

use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::engine::{InferenceEngine, ModelKind, ModelSpec, SessionOptions, Transform};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Mock engine with predictable outputs.
///
/// - spectral: `mel_frames` frames of `num_mels` values, every value equal to
///   the first sample of the input window
/// - embedding: `emb_features` values, every value equal to the first mel
///   value of the input window
/// - classifier: replays the scripted scores for its wake word, one per call,
///   then returns `0.0`
#[derive(Debug, Clone)]
pub struct MockEngine {
    mel_frames: usize,
    num_mels: usize,
    emb_features: usize,
    scores: HashMap<String, Vec<f32>>,
    load_failures: HashSet<String>,
    run_failures: HashSet<String>,
    load_panics: HashSet<String>,
    run_panics: HashSet<String>,
    loaded: Arc<Mutex<Vec<(ModelSpec, SessionOptions)>>>,
}

impl MockEngine {
    /// Create a mock engine with the default model geometry.
    pub fn new() -> Self {
        Self {
            mel_frames: 8,
            num_mels: defaults::NUM_MELS,
            emb_features: defaults::EMB_FEATURES,
            scores: HashMap::new(),
            load_failures: HashSet::new(),
            run_failures: HashSet::new(),
            load_panics: HashSet::new(),
            run_panics: HashSet::new(),
            loaded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of mel frames produced per spectral call.
    pub fn with_mel_frames(mut self, frames: usize) -> Self {
        self.mel_frames = frames;
        self
    }

    pub fn with_num_mels(mut self, num_mels: usize) -> Self {
        self.num_mels = num_mels;
        self
    }

    pub fn with_emb_features(mut self, features: usize) -> Self {
        self.emb_features = features;
        self
    }

    /// Script the probabilities returned by a wake word's classifier.
    pub fn with_scores(mut self, wake_word: &str, scores: Vec<f32>) -> Self {
        self.scores.insert(wake_word.to_string(), scores);
        self
    }

    /// Make loading the named model fail (`"melspectrogram"`, `"embedding"`,
    /// or a wake word name).
    pub fn with_load_failure(mut self, name: &str) -> Self {
        self.load_failures.insert(name.to_string());
        self
    }

    /// Make every invocation of the named model fail.
    pub fn with_run_failure(mut self, name: &str) -> Self {
        self.run_failures.insert(name.to_string());
        self
    }

    /// Panic while loading the named model.
    pub fn with_load_panic(mut self, name: &str) -> Self {
        self.load_panics.insert(name.to_string());
        self
    }

    /// Panic on every invocation of the named model.
    pub fn with_run_panic(mut self, name: &str) -> Self {
        self.run_panics.insert(name.to_string());
        self
    }

    /// Models loaded so far, with the options they were loaded with.
    pub fn loaded_models(&self) -> Vec<(ModelSpec, SessionOptions)> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for MockEngine {
    fn load(&self, spec: &ModelSpec, options: &SessionOptions) -> Result<Box<dyn Transform>> {
        if self.load_panics.contains(&spec.name) {
            panic!("mock load panic: {}", spec);
        }
        if self.load_failures.contains(&spec.name) {
            return Err(WakelineError::ModelLoad {
                model: spec.to_string(),
                message: "mock load failure".to_string(),
            });
        }

        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((spec.clone(), *options));

        let output = match spec.kind {
            ModelKind::Spectral => MockOutput::Repeat(self.mel_frames * self.num_mels),
            ModelKind::Embedding => MockOutput::Repeat(self.emb_features),
            ModelKind::Classifier => MockOutput::Script {
                scores: self.scores.get(&spec.name).cloned().unwrap_or_default(),
                cursor: 0,
            },
        };

        Ok(Box::new(MockTransform {
            name: spec.to_string(),
            output,
            fail: self.run_failures.contains(&spec.name),
            panic: self.run_panics.contains(&spec.name),
        }))
    }
}

#[derive(Debug)]
enum MockOutput {
    Repeat(usize),
    Script { scores: Vec<f32>, cursor: usize },
}

#[derive(Debug)]
struct MockTransform {
    name: String,
    output: MockOutput,
    fail: bool,
    panic: bool,
}

impl Transform for MockTransform {
    fn run(&mut self, input: &[f32], shape: &[usize]) -> Result<Vec<f32>> {
        if self.panic {
            panic!("mock inference panic: {}", self.name);
        }
        if self.fail {
            return Err(WakelineError::Inference {
                station: self.name.clone(),
                message: "mock inference failure".to_string(),
            });
        }

        let expected: usize = shape.iter().product();
        if input.len() != expected {
            return Err(WakelineError::Inference {
                station: self.name.clone(),
                message: format!(
                    "input has {} values, shape {:?} needs {}",
                    input.len(),
                    shape,
                    expected
                ),
            });
        }

        match &mut self.output {
            MockOutput::Repeat(len) => {
                let first = input.first().copied().unwrap_or(0.0);
                Ok(vec![first; *len])
            }
            MockOutput::Script { scores, cursor } => {
                let score = scores.get(*cursor).copied().unwrap_or(0.0);
                *cursor += 1;
                Ok(vec![score])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectral_repeats_first_sample() {
        let engine = MockEngine::new().with_mel_frames(2).with_num_mels(3);
        let mut model = engine
            .load(&ModelSpec::spectral(), &SessionOptions::default())
            .unwrap();

        let output = model.run(&[7.0, 1.0, 1.0, 1.0], &[1, 4]).unwrap();
        assert_eq!(output, vec![7.0; 6]);
    }

    #[test]
    fn test_classifier_replays_script_then_zero() {
        let engine = MockEngine::new().with_scores("alexa", vec![0.9, 0.1]);
        let mut model = engine
            .load(&ModelSpec::classifier("alexa"), &SessionOptions::default())
            .unwrap();

        let input = [0.0; 4];
        assert_eq!(model.run(&input, &[1, 2, 2]).unwrap(), vec![0.9]);
        assert_eq!(model.run(&input, &[1, 2, 2]).unwrap(), vec![0.1]);
        assert_eq!(model.run(&input, &[1, 2, 2]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let engine = MockEngine::new();
        let mut model = engine
            .load(&ModelSpec::embedding(), &SessionOptions::default())
            .unwrap();

        let result = model.run(&[1.0, 2.0, 3.0], &[1, 2, 2, 1]);
        assert!(matches!(result, Err(WakelineError::Inference { .. })));
    }

    #[test]
    fn test_load_failure() {
        let engine = MockEngine::new().with_load_failure("embedding");
        let result = engine.load(&ModelSpec::embedding(), &SessionOptions::default());

        match result {
            Err(WakelineError::ModelLoad { model, .. }) => assert_eq!(model, "embedding"),
            _ => panic!("Expected ModelLoad error"),
        }
        assert!(engine.loaded_models().is_empty());
    }

    #[test]
    fn test_run_failure() {
        let engine = MockEngine::new().with_run_failure("alexa");
        let mut model = engine
            .load(&ModelSpec::classifier("alexa"), &SessionOptions::default())
            .unwrap();

        assert!(model.run(&[0.0], &[1, 1, 1]).is_err());
    }

    #[test]
    fn test_records_loaded_models() {
        let engine = MockEngine::new();
        let options = SessionOptions::default();
        engine.load(&ModelSpec::spectral(), &options).unwrap();
        engine.load(&ModelSpec::classifier("alexa"), &options).unwrap();

        let loaded = engine.loaded_models();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, ModelSpec::spectral());
        assert_eq!(loaded[1].0, ModelSpec::classifier("alexa"));
        assert_eq!(loaded[1].1, options);
    }
}
