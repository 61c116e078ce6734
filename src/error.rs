//! Error types for wakeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WakelineError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Inference engine errors
    #[error("Failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("Inference failed in {station}: {message}")]
    Inference { station: String, message: String },

    // Pipeline lifecycle errors
    #[error("Worker thread '{worker}' panicked: {message}")]
    WorkerPanicked { worker: String, message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    // Audio decoding errors
    #[error("Audio decoding failed: {message}")]
    AudioDecode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WakelineError>;
