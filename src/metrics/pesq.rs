//! Narrowband perceptual quality estimator
//!
//! A perceptual model in the style of ITU-T P.862 narrowband mode:
//!
//! 1. Both signals are level aligned to a fixed mean power.
//! 2. Hann-windowed 32 ms frames (50% overlap) are mapped to Bark bands
//!    covering the 100-3500 Hz telephone band.
//! 3. The reference spectrum is partially equalised towards the degraded
//!    one, and the degraded frames get a smoothed gain compensation.
//! 4. Band powers become Zwicker loudness densities; their differences,
//!    after a masking dead zone, give symmetric and asymmetric disturbances.
//! 5. Frame disturbances are aggregated with an L6 norm over split-second
//!    intervals and an L2 norm over time, combined into a raw score and
//!    mapped to MOS-LQO (P.862.1).
//!
//! This is an estimator with the same inputs, score range and failure modes
//! as the standard algorithm; it does not reproduce P.862 bit-exactly (there
//! is no IRS filter and no variable-delay alignment). Plug a conformant
//! implementation in through `PerceptualQuality` where exact scores matter.

use log::debug;

use crate::dsp::SpectrumAnalyzer;
use crate::engine::buffer::dot;
use crate::error::{EvalError, Result};
use crate::metrics::PerceptualQuality;

const METRIC_NAME: &str = "pesq";

/// Mean power both signals are aligned to
const TARGET_POWER: f64 = 1e7;

/// Narrowband analysis range
const BAND_LOW_HZ: f64 = 100.0;
const BAND_HIGH_HZ: f64 = 3500.0;

/// Width of one critical band group
const BAND_WIDTH_BARK: f64 = 0.5;

/// Reference frames below this power count as silence
const SILENCE_POWER: f64 = TARGET_POWER * 1e-5;

// Zwicker loudness model
const ZWICKER_POWER: f64 = 0.23;
const LOUDNESS_SCALE: f64 = 0.1866;
const HEARING_THRESHOLD: f64 = 100.0;

// Disturbance processing
const DEAD_ZONE: f64 = 0.25;
const ASYMMETRY_EXPONENT: f64 = 1.2;
const ASYMMETRY_FLOOR: f64 = 3.0;
const ASYMMETRY_CEILING: f64 = 12.0;
const MAX_FRAME_DISTURBANCE: f64 = 45.0;
const FRAMES_PER_INTERVAL: usize = 20;

// Score mapping
const SYMMETRIC_WEIGHT: f64 = 0.1;
const ASYMMETRIC_WEIGHT: f64 = 0.0309;
const RAW_MAX: f64 = 4.5;
const RAW_MIN: f64 = -0.5;

/// Narrowband perceptual quality estimator (MOS-LQO, roughly 1.0 to 4.55)
///
/// Accepts 8000 Hz and 16000 Hz input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowbandPesq;

impl NarrowbandPesq {
    pub fn new() -> Self {
        Self
    }

    /// Minimum number of samples the estimator accepts at `sample_rate`
    ///
    /// A quarter of a second, the same limit P.862 applies once its delay
    /// search padding is discounted.
    pub fn min_samples(sample_rate: u32) -> usize {
        sample_rate as usize / 4
    }
}

impl PerceptualQuality for NarrowbandPesq {
    fn score(&self, reference: &[f64], degraded: &[f64], sample_rate: u32) -> Result<f64> {
        if sample_rate != 8000 && sample_rate != 16000 {
            return Err(EvalError::UnsupportedSampleRate {
                metric: METRIC_NAME,
                sample_rate,
            });
        }

        let required = Self::min_samples(sample_rate);
        let available = reference.len().min(degraded.len());
        if available < required {
            return Err(EvalError::BufferTooShort {
                metric: METRIC_NAME,
                samples: available,
                required,
            });
        }

        let reference = level_align(&reference[..available]).ok_or(EvalError::NoUtterances)?;
        let degraded = level_align(&degraded[..available]).unwrap_or_else(|| vec![0.0; available]);

        let frame_len = sample_rate as usize * 32 / 1000;
        let model = BarkModel::new(frame_len, sample_rate);
        let mut ref_bands = model.band_powers(&reference);
        let mut deg_bands = model.band_powers(&degraded);

        let ref_energy: Vec<f64> = ref_bands.iter().map(|f| f.iter().sum()).collect();
        let active: Vec<bool> = ref_energy.iter().map(|&e| e > SILENCE_POWER).collect();
        if !active.iter().any(|&a| a) {
            return Err(EvalError::NoUtterances);
        }

        compensate_frequency_response(&mut ref_bands, &deg_bands, &active);
        compensate_gain(&ref_bands, &mut deg_bands);

        let mut symmetric = Vec::with_capacity(ref_bands.len());
        let mut asymmetric = Vec::with_capacity(ref_bands.len());
        for (t, (ref_frame, deg_frame)) in ref_bands.iter().zip(deg_bands.iter()).enumerate() {
            let (sym, asym) = model.frame_disturbance(ref_frame, deg_frame);
            let weight = ((ref_energy[t] + 1e5) / TARGET_POWER).powf(0.04);
            symmetric.push(sym.min(MAX_FRAME_DISTURBANCE) / weight);
            asymmetric.push(asym.min(MAX_FRAME_DISTURBANCE) / weight);
        }

        let d_sym = aggregate_over_time(&symmetric);
        let d_asym = aggregate_over_time(&asymmetric);
        let raw = (RAW_MAX - SYMMETRIC_WEIGHT * d_sym - ASYMMETRIC_WEIGHT * d_asym)
            .clamp(RAW_MIN, RAW_MAX);

        debug!(
            "pesq: {} frames, d_sym {:.3}, d_asym {:.3}, raw {:.3}",
            symmetric.len(),
            d_sym,
            d_asym,
            raw
        );
        Ok(mos_lqo(raw))
    }

    fn name(&self) -> &'static str {
        METRIC_NAME
    }
}

/// P.862.1 mapping from raw score to MOS-LQO
pub fn mos_lqo(raw: f64) -> f64 {
    0.999 + 4.0 / (1.0 + (-1.4945 * raw + 4.6607).exp())
}

/// Zwicker-Terhardt critical band rate
fn hz_to_bark(hz: f64) -> f64 {
    13.0 * (0.00076 * hz).atan() + 3.5 * (hz / 7500.0).powi(2).atan()
}

/// Scale a signal to `TARGET_POWER`; `None` when it has no energy
fn level_align(samples: &[f64]) -> Option<Vec<f64>> {
    let power = dot(samples, samples) / samples.len() as f64;
    if power <= 0.0 || !power.is_finite() {
        return None;
    }
    let gain = (TARGET_POWER / power).sqrt();
    Some(samples.iter().map(|s| s * gain).collect())
}

/// Bark band layout and per-frame analysis
struct BarkModel {
    analyzer: SpectrumAnalyzer,
    hop: usize,
    /// For each band, the FFT bins it sums
    bands: Vec<Vec<usize>>,
    /// Normalisation turning `|X|^2` into mean-square power
    power_scale: f64,
}

impl BarkModel {
    fn new(frame_len: usize, sample_rate: u32) -> Self {
        let analyzer = SpectrumAnalyzer::new(frame_len, frame_len);
        let bin_hz = sample_rate as f64 / frame_len as f64;
        let low_bark = hz_to_bark(BAND_LOW_HZ);
        let num_bands = ((hz_to_bark(BAND_HIGH_HZ) - low_bark) / BAND_WIDTH_BARK).floor() as usize;

        let mut bands = vec![Vec::new(); num_bands];
        for bin in 0..analyzer.num_bins() {
            let hz = bin as f64 * bin_hz;
            if !(BAND_LOW_HZ..BAND_HIGH_HZ).contains(&hz) {
                continue;
            }
            let band = ((hz_to_bark(hz) - low_bark) / BAND_WIDTH_BARK) as usize;
            if band < num_bands {
                bands[band].push(bin);
            }
        }
        bands.retain(|b| !b.is_empty());

        // one-sided spectrum: double every bin to keep Parseval's total
        let power_scale = 2.0 / (frame_len as f64 * analyzer.window_energy());

        Self {
            analyzer,
            hop: frame_len / 2,
            bands,
            power_scale,
        }
    }

    /// Per-frame Bark band powers
    fn band_powers(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        let frame_len = self.analyzer.frame_len();
        let mut frames = Vec::new();
        let mut start = 0;
        while start + frame_len <= samples.len() {
            let spectrum = self.analyzer.power_spectrum(&samples[start..start + frame_len]);
            let bands = self
                .bands
                .iter()
                .map(|bins| bins.iter().map(|&k| spectrum[k]).sum::<f64>() * self.power_scale)
                .collect();
            frames.push(bands);
            start += self.hop;
        }
        frames
    }

    /// Symmetric and asymmetric disturbance of one frame
    fn frame_disturbance(&self, reference: &[f64], degraded: &[f64]) -> (f64, f64) {
        let mut sym = Vec::with_capacity(reference.len());
        let mut asym = Vec::with_capacity(reference.len());

        for (&px, &py) in reference.iter().zip(degraded.iter()) {
            let lx = loudness(px);
            let ly = loudness(py);

            let diff = ly - lx;
            let mask = DEAD_ZONE * lx.min(ly);
            let d = if diff > mask {
                diff - mask
            } else if diff < -mask {
                diff + mask
            } else {
                0.0
            };

            let mut h = ((py + 50.0) / (px + 50.0)).powf(ASYMMETRY_EXPONENT);
            if h < ASYMMETRY_FLOOR {
                h = 0.0;
            }
            sym.push(d);
            asym.push(d * h.min(ASYMMETRY_CEILING));
        }

        (pseudo_lp(&sym, 2.0), pseudo_lp(&asym, 1.0))
    }
}

/// Zwicker loudness density of a band power
fn loudness(power: f64) -> f64 {
    let l = LOUDNESS_SCALE
        * (HEARING_THRESHOLD / 0.5).powf(ZWICKER_POWER)
        * ((0.5 + 0.5 * power / HEARING_THRESHOLD).powf(ZWICKER_POWER) - 1.0);
    l.max(0.0)
}

/// Width-weighted Lp norm over bands
fn pseudo_lp(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total_weight = BAND_WIDTH_BARK * values.len() as f64;
    let sum: f64 = values
        .iter()
        .map(|v| (v.abs() * BAND_WIDTH_BARK).powf(p))
        .sum();
    (sum / total_weight).powf(1.0 / p) * total_weight
}

/// Equalise the reference towards the degraded long-term band spectrum
fn compensate_frequency_response(reference: &mut [Vec<f64>], degraded: &[Vec<f64>], active: &[bool]) {
    let num_bands = reference.first().map_or(0, |f| f.len());
    let count = active.iter().filter(|&&a| a).count().max(1) as f64;

    for band in 0..num_bands {
        let mut ref_sum = 0.0;
        let mut deg_sum = 0.0;
        for ((r, d), &is_active) in reference.iter().zip(degraded.iter()).zip(active.iter()) {
            if is_active {
                ref_sum += r[band];
                deg_sum += d[band];
            }
        }
        let ratio = ((deg_sum / count + 1000.0) / (ref_sum / count + 1000.0)).clamp(0.01, 100.0);
        for frame in reference.iter_mut() {
            frame[band] *= ratio;
        }
    }
}

/// Smoothed per-frame gain matching degraded loudness to the reference
fn compensate_gain(reference: &[Vec<f64>], degraded: &mut [Vec<f64>]) {
    let mut smoothed = 1.0;
    for (ref_frame, deg_frame) in reference.iter().zip(degraded.iter_mut()) {
        let ref_total: f64 = ref_frame.iter().sum();
        let deg_total: f64 = deg_frame.iter().sum();
        let ratio = ((ref_total + 5e3) / (deg_total + 5e3)).clamp(3e-4, 5.0);
        smoothed = 0.8 * smoothed + 0.2 * ratio;
        for band in deg_frame.iter_mut() {
            *band *= smoothed;
        }
    }
}

/// L6 over split-second intervals, then L2 over intervals
fn aggregate_over_time(disturbance: &[f64]) -> f64 {
    if disturbance.is_empty() {
        return 0.0;
    }

    let interval_norm = |chunk: &[f64]| -> f64 {
        let mean6 = chunk.iter().map(|d| d.powi(6)).sum::<f64>() / chunk.len() as f64;
        mean6.powf(1.0 / 6.0)
    };

    let intervals: Vec<f64> = if disturbance.len() <= FRAMES_PER_INTERVAL {
        vec![interval_norm(disturbance)]
    } else {
        (0..=disturbance.len() - FRAMES_PER_INTERVAL)
            .step_by(FRAMES_PER_INTERVAL / 2)
            .map(|start| interval_norm(&disturbance[start..start + FRAMES_PER_INTERVAL]))
            .collect()
    };

    (intervals.iter().map(|i| i * i).sum::<f64>() / intervals.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic speech-like test signal: two partials with a slow
    /// syllabic envelope and short pauses.
    fn speech_like(len: usize, sample_rate: u32) -> Vec<f64> {
        let fs = sample_rate as f64;
        (0..len)
            .map(|i| {
                let t = i as f64 / fs;
                let envelope = (std::f64::consts::PI * 3.0 * t).sin().abs();
                envelope
                    * (0.6 * (2.0 * std::f64::consts::PI * 220.0 * t).sin()
                        + 0.3 * (2.0 * std::f64::consts::PI * 1250.0 * t).sin())
            })
            .collect()
    }

    /// Deterministic broadband disturbance
    fn hiss(len: usize, amount: f64) -> Vec<f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                amount * ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 2.0
            })
            .collect()
    }

    fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
    }

    #[test]
    fn test_min_samples() {
        assert_eq!(NarrowbandPesq::min_samples(8000), 2000);
        assert_eq!(NarrowbandPesq::min_samples(16000), 4000);
    }

    #[test]
    fn test_identical_signals_score_high() {
        let x = speech_like(24000, 8000);
        let score = NarrowbandPesq.score(&x, &x, 8000).unwrap();
        assert!(score > 4.4, "identical signals scored {}", score);
        assert!(score <= 4.6);
    }

    #[test]
    fn test_noise_lowers_score() {
        let x = speech_like(24000, 8000);
        let light = add(&x, &hiss(x.len(), 0.02));
        let heavy = add(&x, &hiss(x.len(), 0.3));

        let clean_score = NarrowbandPesq.score(&x, &x, 8000).unwrap();
        let light_score = NarrowbandPesq.score(&x, &light, 8000).unwrap();
        let heavy_score = NarrowbandPesq.score(&x, &heavy, 8000).unwrap();

        assert!(clean_score > light_score);
        assert!(light_score > heavy_score);
        assert!(heavy_score >= 0.999);
    }

    #[test]
    fn test_wideband_rate_accepted() {
        let x = speech_like(32000, 16000);
        assert!(NarrowbandPesq.score(&x, &x, 16000).is_ok());
    }

    #[test]
    fn test_short_buffer_fails() {
        let x = speech_like(1999, 8000);
        let result = NarrowbandPesq.score(&x, &x, 8000);
        assert!(matches!(
            result,
            Err(EvalError::BufferTooShort {
                samples: 1999,
                required: 2000,
                ..
            })
        ));
    }

    #[test]
    fn test_half_second_scores() {
        let x = speech_like(4000, 8000);
        let noisy = add(&x, &hiss(x.len(), 0.05));

        let clean_score = NarrowbandPesq.score(&x, &x, 8000).unwrap();
        let noisy_score = NarrowbandPesq.score(&x, &noisy, 8000).unwrap();
        assert!(clean_score.is_finite() && clean_score > 1.0);
        assert!(noisy_score.is_finite() && noisy_score <= clean_score);
    }

    #[test]
    fn test_quarter_second_at_16k_scores() {
        let x = speech_like(4000, 16000);
        assert!(NarrowbandPesq.score(&x, &x, 16000).is_ok());
    }

    #[test]
    fn test_empty_buffer_fails() {
        assert!(NarrowbandPesq.score(&[], &[], 8000).is_err());
    }

    #[test]
    fn test_unsupported_rate_fails() {
        let x = speech_like(44100, 44100);
        assert!(matches!(
            NarrowbandPesq.score(&x, &x, 44100),
            Err(EvalError::UnsupportedSampleRate { .. })
        ));
    }

    #[test]
    fn test_silent_reference_fails() {
        let silent = vec![0.0; 16000];
        let y = speech_like(16000, 8000);
        assert!(matches!(
            NarrowbandPesq.score(&silent, &y, 8000),
            Err(EvalError::NoUtterances)
        ));
    }

    #[test]
    fn test_mos_mapping_range() {
        assert!((mos_lqo(RAW_MAX) - 4.549).abs() < 0.01);
        assert!(mos_lqo(RAW_MIN) > 0.999);
        assert!(mos_lqo(RAW_MIN) < 1.1);
    }

    #[test]
    fn test_bark_model_covers_band() {
        let model = BarkModel::new(256, 8000);
        assert!(model.bands.len() > 20);
        assert!(model.bands.iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn test_pseudo_lp_of_zero_is_zero() {
        assert_eq!(pseudo_lp(&[0.0; 10], 2.0), 0.0);
        assert_eq!(aggregate_over_time(&[]), 0.0);
    }
}
