//! WAV file replay: decode, downmix and resample to 16 kHz mono PCM, then
//! hand the samples to a pipeline in fixed-size chunks.

use crate::defaults::{CHUNK_SAMPLES, SAMPLE_RATE};
use crate::error::{Result, WakelineError};
use crate::pipeline::PipelineHandle;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decoded WAV audio, ready for [`PipelineHandle::ingest_pcm`].
///
/// Accepts 16-bit integer and 32-bit float files with any channel count and
/// sample rate.
pub struct WavSource {
    samples: Vec<i16>,
    chunk_size: usize,
}

impl WavSource {
    /// Decode WAV data from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| decode_error("parse WAV data", e))?;

        let spec = wav_reader.spec();
        let raw_samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => wav_reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| decode_error("read WAV samples", e))?,
            (hound::SampleFormat::Float, 32) => wav_reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| decode_error("read WAV samples", e))?,
            (format, bits) => {
                return Err(WakelineError::AudioDecode {
                    message: format!("unsupported WAV format: {:?} {} bit", format, bits),
                });
            }
        };

        let mono_samples = downmix(raw_samples, spec.channels);
        let samples = resample(&mono_samples, spec.sample_rate, SAMPLE_RATE);

        tracing::debug!(
            source_rate = spec.sample_rate,
            channels = spec.channels,
            samples = samples.len(),
            "decoded WAV"
        );

        Ok(Self {
            samples,
            chunk_size: CHUNK_SAMPLES,
        })
    }

    /// Decode a WAV file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Samples per chunk handed out by [`WavSource::chunks`].
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds at 16 kHz.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / SAMPLE_RATE as f32
    }

    /// Fixed-size chunks; the last one may be shorter.
    pub fn chunks(&self) -> std::slice::Chunks<'_, i16> {
        self.samples.chunks(self.chunk_size)
    }

    /// Push every chunk into a running pipeline. Returns the sample count.
    pub fn feed(&self, handle: &PipelineHandle) -> usize {
        for chunk in self.chunks() {
            handle.ingest_pcm(chunk);
        }
        self.samples.len()
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

fn decode_error(action: &str, e: hound::Error) -> WakelineError {
    WakelineError::AudioDecode {
        message: format!("Failed to {}: {}", action, e),
    }
}

/// Average interleaved frames down to one channel.
fn downmix(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples;
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            match samples.get(source_idx + 1) {
                Some(&right) => {
                    let left = samples[source_idx] as f64;
                    (left + (right as f64 - left) * fraction) as i16
                }
                None => samples[source_idx],
            }
        })
        .collect()
}
