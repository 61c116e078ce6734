//! wakeline - Streaming wake word detection
//!
//! Audio flows through a spectral station, an embedding station, and one
//! detector station per wake word, each on its own thread. Model inference
//! sits behind [`inference::InferenceEngine`].

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod inference;
pub mod pipeline;

// Core traits (samples → inference → sink)
pub use inference::{InferenceEngine, MockEngine, ModelSpec, SessionOptions, Transform};
pub use pipeline::sink::{ChannelSink, CollectorSink, EventSink, StdoutSink};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineHandle, PipelineSettings};
pub use pipeline::types::{Detection, DetectorEvent, PipelineReport, StationStats};
pub use pipeline::activation::{ActivationConfig, next_activation};

// Error handling
pub use error::{Result, WakelineError};

// Config
pub use config::Config;

// Audio replay
pub use audio::WavSource;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        // In a git repo build, GIT_HASH is set → expect "0.1.0+<hash>"
        // In CI without git, expect plain "0.1.0"
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(
                hash_part.len(),
                7,
                "Git hash should be 7 chars, got: {}",
                hash_part
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
