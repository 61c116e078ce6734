//! Embedding station: sliding window over mel frames → embedding vectors,
//! broadcast to every detector.

use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::{InferenceEngine, ModelSpec, SessionOptions, Transform};
use crate::pipeline::error::StationError;
use crate::pipeline::stage_buffer::StageBuffer;
use crate::pipeline::station::Station;
use std::sync::Arc;

pub struct EmbeddingStation {
    engine: Arc<dyn InferenceEngine>,
    options: SessionOptions,
    model: Option<Box<dyn Transform>>,
    num_mels: usize,
    window_frames: usize,
    step_frames: usize,
    features: usize,
    /// One buffer per detector, fed identical vectors.
    outputs: Vec<Arc<StageBuffer>>,
}

impl EmbeddingStation {
    pub fn new(engine: Arc<dyn InferenceEngine>, outputs: Vec<Arc<StageBuffer>>) -> Self {
        Self {
            engine,
            options: SessionOptions::default(),
            model: None,
            num_mels: defaults::NUM_MELS,
            window_frames: defaults::EMB_WINDOW_SIZE,
            step_frames: defaults::EMB_STEP_SIZE,
            features: defaults::EMB_FEATURES,
            outputs,
        }
    }

    pub fn with_num_mels(mut self, num_mels: usize) -> Self {
        self.num_mels = num_mels;
        self
    }

    /// Mel frames per window and per step.
    pub fn with_window(mut self, window_frames: usize, step_frames: usize) -> Self {
        self.window_frames = window_frames;
        self.step_frames = step_frames;
        self
    }

    pub fn with_features(mut self, features: usize) -> Self {
        self.features = features;
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Number of windows a station emits from `frames` buffered frames before it
/// needs more input.
pub fn window_count(frames: usize, window: usize, step: usize) -> usize {
    if frames < window || step == 0 {
        0
    } else {
        (frames - window) / step + 1
    }
}

impl Station for EmbeddingStation {
    fn name(&self) -> String {
        "embedding".to_string()
    }

    fn load(&mut self) -> Result<()> {
        self.model = Some(self.engine.load(&ModelSpec::embedding(), &self.options)?);
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.window_frames * self.num_mels
    }

    fn step_len(&self) -> usize {
        self.step_frames * self.num_mels
    }

    fn process(&mut self, window: &[f32]) -> std::result::Result<(), StationError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| StationError::Fatal("embedding model not loaded".to_string()))?;

        // [1, window_frames, num_mels, 1] → [1, 1, 1, features]
        let embedding = model.run(window, &[1, self.window_frames, self.num_mels, 1])?;
        if embedding.len() != self.features {
            return Err(WakelineError::Inference {
                station: self.name(),
                message: format!(
                    "expected {} features, got {}",
                    self.features,
                    embedding.len()
                ),
            }
            .into());
        }

        for output in &self.outputs {
            output.push(&embedding);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        for output in &self.outputs {
            output.mark_exhausted();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockEngine;
    use crate::pipeline::barrier::ReadyBarrier;
    use crate::pipeline::error::LogReporter;
    use crate::pipeline::station::StationRunner;

    fn drain_all(buffer: &StageBuffer) -> Vec<f32> {
        let mut all = Vec::new();
        while let Some(values) = buffer.drain_wait() {
            all.extend(values);
        }
        all
    }

    #[test]
    fn test_window_count() {
        assert_eq!(window_count(75, 76, 8), 0);
        assert_eq!(window_count(76, 76, 8), 1);
        assert_eq!(window_count(83, 76, 8), 1);
        assert_eq!(window_count(84, 76, 8), 2);
        assert_eq!(window_count(200, 76, 8), 16);
    }

    fn run_embedding(mel_frames: usize, detectors: usize) -> (u64, Vec<Vec<f32>>) {
        let num_mels = 4;
        let features = 3;
        let engine = Arc::new(
            MockEngine::new()
                .with_num_mels(num_mels)
                .with_emb_features(features),
        );
        let mels = Arc::new(StageBuffer::new());
        let outputs: Vec<_> = (0..detectors).map(|_| Arc::new(StageBuffer::new())).collect();

        let station = EmbeddingStation::new(engine, outputs.clone())
            .with_num_mels(num_mels)
            .with_window(10, 3)
            .with_features(features);
        let runner = StationRunner::spawn(
            station,
            mels.clone(),
            Arc::new(ReadyBarrier::new()),
            Arc::new(LogReporter),
        )
        .unwrap();

        // Every frame carries its index in all bins
        for frame in 0..mel_frames {
            mels.push(&vec![frame as f32; num_mels]);
        }
        mels.mark_exhausted();

        let stats = runner.join().unwrap();
        let received = outputs.iter().map(|o| drain_all(o)).collect();
        (stats.windows, received)
    }

    #[test]
    fn test_sliding_window_count_law() {
        for mel_frames in [9, 10, 12, 13, 31, 40] {
            let (windows, received) = run_embedding(mel_frames, 1);
            let expected = window_count(mel_frames, 10, 3);
            assert_eq!(windows as usize, expected, "mel_frames = {}", mel_frames);
            assert_eq!(received[0].len(), expected * 3);
        }
    }

    #[test]
    fn test_windows_advance_by_step() {
        let (_, received) = run_embedding(16, 1);
        // Mock embedding repeats the first mel value of the window: the window
        // start frame
        let starts: Vec<f32> = received[0].chunks(3).map(|v| v[0]).collect();
        assert_eq!(starts, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn test_broadcast_identical_to_every_detector() {
        let (windows, received) = run_embedding(25, 3);
        assert_eq!(windows, 6);
        assert_eq!(received[0], received[1]);
        assert_eq!(received[1], received[2]);
        assert_eq!(received[0].len(), 6 * 3);
    }

    #[test]
    fn test_wrong_feature_count_is_fatal() {
        let engine = Arc::new(MockEngine::new().with_num_mels(2).with_emb_features(5));
        let mels = Arc::new(StageBuffer::new());
        let output = Arc::new(StageBuffer::new());

        let station = EmbeddingStation::new(engine, vec![output.clone()])
            .with_num_mels(2)
            .with_window(1, 1)
            .with_features(4);
        let runner = StationRunner::spawn(
            station,
            mels.clone(),
            Arc::new(ReadyBarrier::new()),
            Arc::new(LogReporter),
        )
        .unwrap();

        mels.push(&[1.0, 1.0]);

        let stats = runner.join().unwrap();
        assert!(stats.failed);
        assert_eq!(output.drain_wait(), None);
    }
}
