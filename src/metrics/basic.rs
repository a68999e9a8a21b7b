//! Error-style metrics: RMSE, SNR and SI-SNR
//!
//! Degenerate denominators are not guarded (except the SI-SNR epsilon); an
//! infinite or NaN result is a valid score.

use crate::dsp::remove_dc;
use crate::engine::buffer::{dot, power_to_db};
use crate::error::Result;
use crate::metrics::ensure_same_length;

/// Damping term for SI-SNR denominators
pub const SI_SNR_EPSILON: f64 = 1e-8;

/// Root-mean-square error between two equal-length signals
pub fn rmse(clean: &[f64], filtered: &[f64]) -> Result<f64> {
    ensure_same_length(clean, filtered)?;
    let sum_sq: f64 = clean
        .iter()
        .zip(filtered.iter())
        .map(|(c, f)| (c - f) * (c - f))
        .sum();
    Ok((sum_sq / clean.len() as f64).sqrt())
}

/// Signal-to-noise ratio in dB: `10 log10(sum(clean^2) / sum((filtered - clean)^2))`
///
/// Identical signals give `+inf`.
pub fn snr(clean: &[f64], filtered: &[f64]) -> Result<f64> {
    ensure_same_length(clean, filtered)?;
    let signal_power = dot(clean, clean);
    let noise_power: f64 = clean
        .iter()
        .zip(filtered.iter())
        .map(|(c, f)| (f - c) * (f - c))
        .sum();
    Ok(power_to_db(signal_power / noise_power))
}

/// Scale-invariant signal-to-noise ratio in dB
///
/// Both signals are re-centred, then `filtered` is projected onto `clean`
/// with a least-squares gain so that any positive rescaling of `filtered`
/// leaves the score unchanged.
pub fn si_snr(clean: &[f64], filtered: &[f64]) -> Result<f64> {
    ensure_same_length(clean, filtered)?;
    let clean = remove_dc(clean);
    let filtered = remove_dc(filtered);

    let alpha = dot(&clean, &filtered) / (dot(&clean, &clean) + SI_SNR_EPSILON);
    let projection: Vec<f64> = clean.iter().map(|c| alpha * c).collect();
    let noise: Vec<f64> = filtered
        .iter()
        .zip(projection.iter())
        .map(|(f, p)| f - p)
        .collect();

    Ok(power_to_db(
        dot(&projection, &projection) / (dot(&noise, &noise) + SI_SNR_EPSILON),
    ))
}
