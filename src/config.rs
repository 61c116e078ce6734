use crate::defaults;
use crate::error::{Result, WakelineError};
use crate::inference::SessionOptions;
use crate::pipeline::{ActivationConfig, PipelineSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub model: ModelConfig,
}

/// Wake word selection and activation tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub wake_words: Vec<String>,
    pub threshold: f32,
    pub trigger_level: i32,
    pub refractory: i32,
    pub step_frames: usize,
    pub debug: bool,
}

/// Tensor geometry of the model set, and inference threading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub chunk_samples: usize,
    pub num_mels: usize,
    pub emb_window_size: usize,
    pub emb_step_size: usize,
    pub emb_features: usize,
    pub ww_features: usize,
    pub intra_threads: usize,
    pub inter_threads: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            wake_words: Vec::new(),
            threshold: defaults::THRESHOLD,
            trigger_level: defaults::TRIGGER_LEVEL,
            refractory: defaults::REFRACTORY,
            step_frames: defaults::STEP_FRAMES,
            debug: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chunk_samples: defaults::CHUNK_SAMPLES,
            num_mels: defaults::NUM_MELS,
            emb_window_size: defaults::EMB_WINDOW_SIZE,
            emb_step_size: defaults::EMB_STEP_SIZE,
            emb_features: defaults::EMB_FEATURES,
            ww_features: defaults::WW_FEATURES,
            intra_threads: 1,
            inter_threads: 1,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WakelineError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                WakelineError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(WakelineError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - WAKELINE_WAKE_WORDS → detection.wake_words (comma-separated)
    /// - WAKELINE_THRESHOLD → detection.threshold
    /// - WAKELINE_TRIGGER_LEVEL → detection.trigger_level
    /// - WAKELINE_REFRACTORY → detection.refractory
    /// - WAKELINE_STEP_FRAMES → detection.step_frames
    /// - WAKELINE_DEBUG → detection.debug (1/true/yes)
    ///
    /// Empty or unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(words) = std::env::var("WAKELINE_WAKE_WORDS") {
            let words: Vec<String> = words
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect();
            if !words.is_empty() {
                self.detection.wake_words = words;
            }
        }

        if let Some(threshold) = env_parse("WAKELINE_THRESHOLD") {
            self.detection.threshold = threshold;
        }
        if let Some(level) = env_parse("WAKELINE_TRIGGER_LEVEL") {
            self.detection.trigger_level = level;
        }
        if let Some(refractory) = env_parse("WAKELINE_REFRACTORY") {
            self.detection.refractory = refractory;
        }
        if let Some(step_frames) = env_parse("WAKELINE_STEP_FRAMES") {
            self.detection.step_frames = step_frames;
        }

        if let Ok(debug) = std::env::var("WAKELINE_DEBUG")
            && !debug.is_empty()
        {
            self.detection.debug = matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/wakeline/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wakeline").join("config.toml"))
    }

    /// Settings for [`crate::pipeline::Pipeline`].
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            wake_words: self.detection.wake_words.clone(),
            activation: ActivationConfig {
                threshold: self.detection.threshold,
                trigger_level: self.detection.trigger_level,
                refractory: self.detection.refractory,
            },
            debug: self.detection.debug,
            step_frames: self.detection.step_frames,
            chunk_samples: self.model.chunk_samples,
            num_mels: self.model.num_mels,
            emb_window_size: self.model.emb_window_size,
            emb_step_size: self.model.emb_step_size,
            emb_features: self.model.emb_features,
            ww_features: self.model.ww_features,
            session: SessionOptions {
                intra_threads: self.model.intra_threads,
                inter_threads: self.model.inter_threads,
            },
        }
    }

    /// Check the configuration describes a runnable pipeline.
    pub fn validate(&self) -> Result<()> {
        self.pipeline_settings().validate()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
}
