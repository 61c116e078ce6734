//! Spectral station: raw samples → rescaled mel frames.

use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::{InferenceEngine, ModelSpec, SessionOptions, Transform};
use crate::pipeline::error::StationError;
use crate::pipeline::stage_buffer::StageBuffer;
use crate::pipeline::station::Station;
use std::sync::Arc;
use tracing::trace;

/// Runs the spectral model over fixed-size sample frames and appends the
/// rescaled mel values to the mel buffer.
pub struct SpectralStation {
    engine: Arc<dyn InferenceEngine>,
    options: SessionOptions,
    model: Option<Box<dyn Transform>>,
    frame_size: usize,
    num_mels: usize,
    output: Arc<StageBuffer>,
}

impl SpectralStation {
    pub fn new(engine: Arc<dyn InferenceEngine>, output: Arc<StageBuffer>) -> Self {
        Self {
            engine,
            options: SessionOptions::default(),
            model: None,
            frame_size: defaults::STEP_FRAMES * defaults::CHUNK_SAMPLES,
            num_mels: defaults::NUM_MELS,
            output,
        }
    }

    /// Samples per spectral invocation.
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_num_mels(mut self, num_mels: usize) -> Self {
        self.num_mels = num_mels;
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Map raw spectral output into the range the embedding model was trained on.
pub fn rescale_mel(values: &mut [f32]) {
    for value in values.iter_mut() {
        *value = *value / defaults::MEL_SCALE + defaults::MEL_OFFSET;
    }
}

impl Station for SpectralStation {
    fn name(&self) -> String {
        "spectral".to_string()
    }

    fn load(&mut self) -> Result<()> {
        self.model = Some(self.engine.load(&ModelSpec::spectral(), &self.options)?);
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.frame_size
    }

    fn step_len(&self) -> usize {
        self.frame_size
    }

    fn process(&mut self, window: &[f32]) -> std::result::Result<(), StationError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| StationError::Fatal("spectral model not loaded".to_string()))?;

        // [1, frame_size] → [1, 1, frames, num_mels]
        let mut mels = model.run(window, &[1, self.frame_size])?;
        if mels.is_empty() || mels.len() % self.num_mels != 0 {
            return Err(WakelineError::Inference {
                station: self.name(),
                message: format!(
                    "output of {} values is not a whole number of {}-bin frames",
                    mels.len(),
                    self.num_mels
                ),
            }
            .into());
        }

        rescale_mel(&mut mels);
        trace!(frames = mels.len() / self.num_mels, "mel frames produced");
        self.output.push(&mels);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.output.mark_exhausted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockEngine;
    use crate::pipeline::barrier::ReadyBarrier;
    use crate::pipeline::error::LogReporter;
    use crate::pipeline::station::StationRunner;
    use approx::assert_relative_eq;

    fn drain_all(buffer: &StageBuffer) -> Vec<f32> {
        let mut all = Vec::new();
        while let Some(values) = buffer.drain_wait() {
            all.extend(values);
        }
        all
    }

    #[test]
    fn test_rescale_mel() {
        let mut values = [0.0, 10.0, -20.0];
        rescale_mel(&mut values);
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 3.0);
        assert_relative_eq!(values[2], 0.0);
    }

    #[test]
    fn test_mel_output_length_and_order() {
        let frame_size = 8;
        let num_mels = 4;
        let frames_per_call = 3;
        let engine = Arc::new(
            MockEngine::new()
                .with_mel_frames(frames_per_call)
                .with_num_mels(num_mels),
        );
        let samples = Arc::new(StageBuffer::new());
        let mels = Arc::new(StageBuffer::new());
        let barrier = Arc::new(ReadyBarrier::new());

        let station = SpectralStation::new(engine, mels.clone())
            .with_frame_size(frame_size)
            .with_num_mels(num_mels);
        let runner =
            StationRunner::spawn(station, samples.clone(), barrier.clone(), Arc::new(LogReporter))
                .unwrap();
        barrier.wait(1).unwrap();

        // Five frames, each filled with its own index, pushed in odd-sized pieces
        let input: Vec<f32> = (0..5)
            .flat_map(|frame| std::iter::repeat_n(frame as f32 * 10.0, frame_size))
            .collect();
        for piece in input.chunks(5) {
            samples.push(piece);
        }
        samples.mark_exhausted();

        let stats = runner.join().unwrap();
        assert_eq!(stats.windows, 5);
        assert_eq!(stats.leftover, 0);

        let output = drain_all(&mels);
        assert_eq!(output.len(), 5 * num_mels * frames_per_call);
        for (frame, values) in output.chunks(num_mels * frames_per_call).enumerate() {
            let expected = frame as f32 + 2.0;
            assert!(values.iter().all(|&v| (v - expected).abs() < 1e-6));
        }
        assert!(mels.is_exhausted());
    }

    #[test]
    fn test_misshapen_output_is_fatal() {
        // 3 frames of 5 values cannot be split into 4-bin frames
        let engine = Arc::new(MockEngine::new().with_mel_frames(3).with_num_mels(5));
        let samples = Arc::new(StageBuffer::new());
        let mels = Arc::new(StageBuffer::new());

        let station = SpectralStation::new(engine, mels.clone())
            .with_frame_size(2)
            .with_num_mels(4);
        let runner = StationRunner::spawn(
            station,
            samples.clone(),
            Arc::new(ReadyBarrier::new()),
            Arc::new(LogReporter),
        )
        .unwrap();

        samples.push(&[1.0, 1.0]);

        let stats = runner.join().unwrap();
        assert!(stats.failed);
        // Downstream still sees exhaustion
        assert_eq!(mels.drain_wait(), None);
    }
}
