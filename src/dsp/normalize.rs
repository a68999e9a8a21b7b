//! Signal Normalizer
//!
//! Removes DC offset and rescales a waveform to unit peak amplitude.

use crate::engine::buffer::{calculate_mean, calculate_peak, Waveform};
use crate::error::{EvalError, Result};

/// Subtract the arithmetic mean from every sample
pub fn remove_dc(samples: &[f64]) -> Vec<f64> {
    let mean = calculate_mean(samples);
    samples.iter().map(|s| s - mean).collect()
}

/// Normalize a waveform to zero mean and unit peak
///
/// # Errors
/// * `SilentWaveform` - If every sample equals the mean, so the peak after
///   DC removal is zero and the division is undefined
pub fn normalize(waveform: &Waveform) -> Result<Waveform> {
    let centered = remove_dc(waveform.samples());
    let peak = calculate_peak(&centered);

    if peak == 0.0 || !peak.is_finite() {
        return Err(EvalError::SilentWaveform);
    }

    let scaled = centered.into_iter().map(|s| s / peak).collect();
    waveform.with_samples(scaled)
}
