//! Audio file I/O for Wiener Eval
//!
//! The audio codec reader and writer collaborators. Recordings are read from
//! WAV (integer or float PCM) and written back as 32-bit float WAV at the
//! source sample rate.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};

use crate::engine::buffer::{linear_to_db, Waveform};
use crate::error::{EvalError, Result};

/// Load a WAV file into a mono waveform
///
/// Integer PCM is scaled to -1.0..1.0. Multi-channel recordings are
/// downmixed by averaging each frame.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `AudioReadError` - If the file is not a readable WAV file
/// * `UnsupportedFormat` - If the header describes an unusable layout
/// * `EmptyWaveform` - If the file holds no samples
pub fn load_waveform(path: &Path) -> Result<Waveform> {
    if !path.exists() {
        return Err(EvalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| EvalError::AudioReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(EvalError::UnsupportedFormat {
            details: "zero-channel audio".to_string(),
        });
    }

    let interleaved = read_samples_as_f64(reader, path)?;
    debug!(
        "Loaded {}: {} Hz, {} ch, {}-bit {:?}, {} samples",
        path.display(),
        spec.sample_rate,
        channels,
        spec.bits_per_sample,
        spec.sample_format,
        interleaved.len()
    );

    let samples = if channels == 1 {
        interleaved
    } else {
        warn!(
            "{} has {} channels; downmixing to mono",
            path.display(),
            channels
        );
        downmix(&interleaved, channels)
    };

    let waveform = Waveform::new(samples, spec.sample_rate)?;
    debug!("Peak level {:.1} dBFS", linear_to_db(waveform.peak()));
    Ok(waveform)
}

/// Save a waveform as mono 32-bit float WAV at its own sample rate
pub fn save_waveform(waveform: &Waveform, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let write_error = |e: hound::Error| EvalError::AudioWriteError {
        path: path.display().to_string(),
        source: e,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
    for &sample in waveform.samples() {
        writer.write_sample(sample as f32).map_err(write_error)?;
    }
    writer.finalize().map_err(write_error)?;

    debug!(
        "Wrote {} samples at {} Hz to {}",
        waveform.len(),
        waveform.sample_rate(),
        path.display()
    );
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read samples from WAV reader and convert to f64
fn read_samples_as_f64<R: std::io::Read>(reader: WavReader<R>, path: &Path) -> Result<Vec<f64>> {
    let spec = reader.spec();
    let read_error = |e: hound::Error| EvalError::AudioReadError {
        path: path.display().to_string(),
        source: e,
    };

    match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64).map_err(read_error))
            .collect(),
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(EvalError::UnsupportedFormat {
                    details: format!("{}-bit integer audio", bits),
                });
            }
            let full_scale = (1u64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / full_scale).map_err(read_error))
                .collect()
        }
    }
}

/// Average interleaved frames down to a single channel
fn downmix(samples: &[f64], channels: usize) -> Vec<f64> {
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
