//! Wake word pipeline: samples → spectral → embedding → N detectors → sink.

use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::{InferenceEngine, SessionOptions};
use crate::pipeline::activation::ActivationConfig;
use crate::pipeline::barrier::ReadyBarrier;
use crate::pipeline::detector_station::DetectorStation;
use crate::pipeline::embedding_station::EmbeddingStation;
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::sink::{EventSink, SharedSink, StdoutSink};
use crate::pipeline::spectral_station::SpectralStation;
use crate::pipeline::stage_buffer::StageBuffer;
use crate::pipeline::station::StationRunner;
use crate::pipeline::types::PipelineReport;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// One detector per wake word (classifier model identifier)
    pub wake_words: Vec<String>,
    /// Activation automaton tuning, shared by all detectors
    pub activation: ActivationConfig,
    /// Emit raw classifier probabilities to the sink
    pub debug: bool,
    /// Audio chunks per spectral invocation
    pub step_frames: usize,
    /// Model geometry
    pub chunk_samples: usize,
    pub num_mels: usize,
    pub emb_window_size: usize,
    pub emb_step_size: usize,
    pub emb_features: usize,
    pub ww_features: usize,
    /// Threading options passed to every model load
    pub session: SessionOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            wake_words: Vec::new(),
            activation: ActivationConfig::default(),
            debug: false,
            step_frames: defaults::STEP_FRAMES,
            chunk_samples: defaults::CHUNK_SAMPLES,
            num_mels: defaults::NUM_MELS,
            emb_window_size: defaults::EMB_WINDOW_SIZE,
            emb_step_size: defaults::EMB_STEP_SIZE,
            emb_features: defaults::EMB_FEATURES,
            ww_features: defaults::WW_FEATURES,
            session: SessionOptions::default(),
        }
    }
}

impl PipelineSettings {
    pub fn with_wake_words<I, S>(mut self, wake_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wake_words = wake_words.into_iter().map(Into::into).collect();
        self
    }

    /// Samples per spectral invocation.
    pub fn frame_size(&self) -> usize {
        self.step_frames * self.chunk_samples
    }

    /// Spectral + embedding + one per detector.
    pub fn worker_count(&self) -> usize {
        self.wake_words.len() + 2
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> WakelineError {
            WakelineError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.wake_words.is_empty() {
            return Err(invalid("wake_words", "at least one wake word is required"));
        }
        if self.wake_words.iter().any(|w| w.trim().is_empty()) {
            return Err(invalid("wake_words", "wake word names must not be empty"));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.wake_words.iter().find(|w| !seen.insert(w.as_str())) {
            return Err(invalid(
                "wake_words",
                &format!("wake word '{}' is listed more than once", duplicate),
            ));
        }
        if !(0.0..=1.0).contains(&self.activation.threshold) {
            return Err(invalid("threshold", "must be between 0.0 and 1.0"));
        }
        if self.activation.trigger_level < 1 {
            return Err(invalid("trigger_level", "must be at least 1"));
        }
        if self.activation.refractory < 0 {
            return Err(invalid("refractory", "must not be negative"));
        }

        for (key, value) in [
            ("step_frames", self.step_frames),
            ("chunk_samples", self.chunk_samples),
            ("num_mels", self.num_mels),
            ("emb_window_size", self.emb_window_size),
            ("emb_step_size", self.emb_step_size),
            ("emb_features", self.emb_features),
            ("ww_features", self.ww_features),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
        }
        if self.emb_step_size > self.emb_window_size {
            return Err(invalid(
                "emb_step_size",
                "must not exceed emb_window_size",
            ));
        }

        Ok(())
    }
}

/// Handle to a running pipeline.
///
/// Dropping the handle drains the pipeline like [`PipelineHandle::shutdown`]
/// but discards the report.
pub struct PipelineHandle {
    samples: Arc<StageBuffer>,
    runners: Vec<StationRunner>,
    sink: SharedSink,
    drained: bool,
}

impl PipelineHandle {
    /// Push audio samples (16 kHz mono, int16 range) into the pipeline.
    ///
    /// Never blocks beyond the sample buffer's lock. The chunk is not
    /// validated.
    pub fn ingest(&self, chunk: &[f32]) {
        self.samples.push(chunk);
    }

    /// Push 16-bit PCM samples.
    pub fn ingest_pcm(&self, chunk: &[i16]) {
        let samples: Vec<f32> = chunk.iter().map(|&s| s as f32).collect();
        self.samples.push(&samples);
    }

    /// Samples waiting for the spectral station.
    pub fn buffered_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn worker_count(&self) -> usize {
        self.runners.len()
    }

    /// Stop accepting input and wait for every station to drain.
    ///
    /// Exhaustion propagates stage by stage; buffered input is processed
    /// first. Partial windows left at the end are discarded.
    pub fn shutdown(mut self) -> Result<PipelineReport> {
        self.drain()
    }

    fn drain(&mut self) -> Result<PipelineReport> {
        self.drained = true;
        self.samples.mark_exhausted();

        let mut report = PipelineReport::default();
        let mut first_error = None;
        for runner in self.runners.drain(..) {
            let station = runner.name().to_string();
            match runner.join() {
                Ok(stats) => report.stations.push(stats),
                Err(e) => {
                    error!(station = %station, "{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        self.sink.finish();
        report.detections = self.sink.detections();
        info!(detections = report.detections, "pipeline drained");

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if !self.drained
            && let Err(e) = self.drain()
        {
            error!("pipeline shutdown on drop failed: {}", e);
        }
    }
}

/// Wake word pipeline builder.
pub struct Pipeline {
    settings: PipelineSettings,
    engine: Arc<dyn InferenceEngine>,
    sink: Box<dyn EventSink>,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline writing detections to stdout.
    pub fn new(settings: PipelineSettings, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            settings,
            engine,
            sink: Box::new(StdoutSink),
            error_reporter: Arc::new(LogReporter),
        }
    }

    /// Sets the event sink.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Starts all stations and blocks until every model is loaded.
    ///
    /// Any load failure is fatal: already running stations are drained and
    /// the load error is returned.
    pub fn start(self) -> Result<PipelineHandle> {
        self.settings.validate()?;
        let settings = &self.settings;

        let samples = Arc::new(StageBuffer::new());
        let mels = Arc::new(StageBuffer::new());
        let embeddings: Vec<Arc<StageBuffer>> = settings
            .wake_words
            .iter()
            .map(|_| Arc::new(StageBuffer::new()))
            .collect();
        let barrier = Arc::new(ReadyBarrier::new());
        let sink = SharedSink::new(self.sink);

        let mut handle = PipelineHandle {
            samples: samples.clone(),
            runners: Vec::with_capacity(settings.worker_count()),
            sink: sink.clone(),
            drained: false,
        };

        let spectral = SpectralStation::new(self.engine.clone(), mels.clone())
            .with_frame_size(settings.frame_size())
            .with_num_mels(settings.num_mels)
            .with_session_options(settings.session);
        handle.runners.push(StationRunner::spawn(
            spectral,
            samples,
            barrier.clone(),
            self.error_reporter.clone(),
        )?);

        let embedding = EmbeddingStation::new(self.engine.clone(), embeddings.clone())
            .with_num_mels(settings.num_mels)
            .with_window(settings.emb_window_size, settings.emb_step_size)
            .with_features(settings.emb_features)
            .with_session_options(settings.session);
        handle.runners.push(StationRunner::spawn(
            embedding,
            mels,
            barrier.clone(),
            self.error_reporter.clone(),
        )?);

        for (index, (wake_word, input)) in settings.wake_words.iter().zip(embeddings).enumerate() {
            let detector = DetectorStation::new(self.engine.clone(), wake_word, index, sink.clone())
                .with_window(settings.ww_features, settings.emb_features)
                .with_activation(settings.activation)
                .with_debug(settings.debug)
                .with_session_options(settings.session);
            handle.runners.push(StationRunner::spawn(
                detector,
                input,
                barrier.clone(),
                self.error_reporter.clone(),
            )?);
        }

        // On error `handle` is dropped here, which drains what was started
        if let Err(e) = barrier.wait(settings.worker_count()) {
            error!(
                ready = barrier.arrived(),
                workers = settings.worker_count(),
                "pipeline start failed: {}",
                e
            );
            return Err(e);
        }

        info!(
            version = %crate::version_string(),
            workers = handle.worker_count(),
            wake_words = ?settings.wake_words,
            "pipeline ready"
        );
        Ok(handle)
    }
}
