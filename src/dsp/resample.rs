//! Sample rate conversion
//!
//! Band-limited windowed-sinc resampling through rubato, so the metric
//! front-ends never see imaged energy above the source Nyquist frequency.

use std::fmt;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{EvalError, Result};

/// Input frames fed to the resampler per call
const CHUNK_SIZE: usize = 1024;

/// Resample a mono signal from `source_rate` to `target_rate`
///
/// The output holds `ceil(len * target_rate / source_rate)` samples and is
/// time-aligned with the input: the filter delay is trimmed from the front
/// and the tail is flushed out of the resampler.
pub fn resample(samples: &[f64], source_rate: u32, target_rate: u32) -> Result<Vec<f64>> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(EvalError::Resample {
            details: format!("cannot convert {} Hz to {} Hz", source_rate, target_rate),
        });
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(resample_error)?;

    let delay = resampler.output_delay();
    let wanted = delay + (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(wanted + CHUNK_SIZE);

    let mut chunks = samples.chunks(CHUNK_SIZE).peekable();
    while let Some(chunk) = chunks.next() {
        let frames = vec![chunk.to_vec()];
        let result = if chunks.peek().is_none() {
            resampler.process_partial(Some(frames.as_slice()), None)
        } else {
            resampler.process(frames.as_slice(), None)
        }
        .map_err(resample_error)?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // Flush the samples still held back by the filter delay
    while output.len() < wanted {
        let tail = resampler
            .process_partial(None::<&[Vec<f64>]>, None)
            .map_err(resample_error)?;
        match tail.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => break,
        }
    }

    output.resize(wanted, 0.0);
    output.drain(..delay);
    Ok(output)
}

fn resample_error(e: impl fmt::Display) -> EvalError {
    EvalError::Resample {
        details: e.to_string(),
    }
}
