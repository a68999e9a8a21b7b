//! Short-time objective intelligibility (STOI)
//!
//! Classic STOI: both signals are resampled to 10 kHz, frames more than
//! 40 dB below the loudest clean frame are dropped, and one-third-octave
//! band envelopes of 384 ms segments are correlated after clipping the
//! processed envelope.

use log::warn;

use crate::dsp::spectrum::{frame_starts, hann_window};
use crate::dsp::{resample, SpectrumAnalyzer};
use crate::error::{EvalError, Result};
use crate::metrics::{ensure_same_length, Intelligibility};

const METRIC_NAME: &str = "stoi";

/// Internal analysis rate
const STOI_SAMPLE_RATE: u32 = 10_000;
/// Frame length in samples at the analysis rate
const FRAME_LEN: usize = 256;
const FFT_SIZE: usize = 512;
const NUM_BANDS: usize = 15;
/// Centre frequency of the lowest one-third-octave band
const MIN_FREQ: f64 = 150.0;
/// Frames per intermediate intelligibility segment
const SEGMENT_LEN: usize = 30;
/// Lower signal-to-distortion bound in dB
const BETA: f64 = -15.0;
/// Dynamic range kept by silent-frame removal, in dB
const DYN_RANGE: f64 = 40.0;

/// Score returned when too few frames survive silence removal
pub const TOO_FEW_FRAMES_SCORE: f64 = 1e-5;

/// Short-time objective intelligibility estimator (0.0 to 1.0)
#[derive(Debug, Clone, Copy, Default)]
pub struct Stoi;

impl Stoi {
    pub fn new() -> Self {
        Self
    }
}

impl Intelligibility for Stoi {
    fn score(&self, clean: &[f64], processed: &[f64], sample_rate: u32) -> Result<f64> {
        ensure_same_length(clean, processed)?;
        if sample_rate == 0 {
            return Err(EvalError::UnsupportedSampleRate {
                metric: METRIC_NAME,
                sample_rate,
            });
        }

        let x = resample(clean, sample_rate, STOI_SAMPLE_RATE)?;
        let y = resample(processed, sample_rate, STOI_SAMPLE_RATE)?;

        let hop = FRAME_LEN / 2;
        let (x, y) = remove_silent_frames(&x, &y, DYN_RANGE, FRAME_LEN, hop).ok_or(
            EvalError::BufferTooShort {
                metric: METRIC_NAME,
                samples: x.len(),
                required: FRAME_LEN + 1,
            },
        )?;

        let analyzer = SpectrumAnalyzer::new(FRAME_LEN, FFT_SIZE);
        let obm = third_octave_bands(STOI_SAMPLE_RATE, FFT_SIZE, NUM_BANDS, MIN_FREQ);
        let x_tob = band_envelopes(&analyzer, &obm, &x, hop);
        let y_tob = band_envelopes(&analyzer, &obm, &y, hop);

        let num_frames = x_tob.first().map_or(0, |b| b.len());
        if num_frames < SEGMENT_LEN {
            warn!(
                "Not enough STFT frames ({}) for intelligibility after removing silent frames; returning {}",
                num_frames, TOO_FEW_FRAMES_SCORE
            );
            return Ok(TOO_FEW_FRAMES_SCORE);
        }

        let clip = 10f64.powf(-BETA / 20.0);
        let mut total = 0.0;
        let mut count = 0usize;

        for end in SEGMENT_LEN..=num_frames {
            let start = end - SEGMENT_LEN;
            for (x_band, y_band) in x_tob.iter().zip(y_tob.iter()) {
                let x_seg = &x_band[start..end];
                let y_seg = &y_band[start..end];

                let norm_const = l2_norm(x_seg) / (l2_norm(y_seg) + f64::EPSILON);
                let y_prime: Vec<f64> = y_seg
                    .iter()
                    .zip(x_seg.iter())
                    .map(|(&yv, &xv)| (yv * norm_const).min(xv * (1.0 + clip)))
                    .collect();

                total += correlation(x_seg, &y_prime);
                count += 1;
            }
        }

        Ok(total / count as f64)
    }

    fn name(&self) -> &'static str {
        METRIC_NAME
    }
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Correlation of two segments after mean removal and unit-norm scaling
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let mean_a = a.iter().sum::<f64>() / a.len() as f64;
    let mean_b = b.iter().sum::<f64>() / b.len() as f64;
    let a: Vec<f64> = a.iter().map(|v| v - mean_a).collect();
    let b: Vec<f64> = b.iter().map(|v| v - mean_b).collect();
    let norm_a = l2_norm(&a) + f64::EPSILON;
    let norm_b = l2_norm(&b) + f64::EPSILON;
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x / norm_a) * (y / norm_b))
        .sum()
}

/// One-third-octave band matrix as per-band FFT bin ranges
fn third_octave_bands(
    sample_rate: u32,
    fft_size: usize,
    num_bands: usize,
    min_freq: f64,
) -> Vec<std::ops::Range<usize>> {
    let num_bins = fft_size / 2 + 1;
    let bin_hz = sample_rate as f64 / fft_size as f64;

    let nearest_bin = |freq: f64| -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for k in 0..num_bins {
            let dist = (k as f64 * bin_hz - freq).powi(2);
            if dist < best_dist {
                best = k;
                best_dist = dist;
            }
        }
        best
    };

    (0..num_bands)
        .map(|k| {
            let k = k as f64;
            let low = min_freq * 2f64.powf((2.0 * k - 1.0) / 6.0);
            let high = min_freq * 2f64.powf((2.0 * k + 1.0) / 6.0);
            nearest_bin(low)..nearest_bin(high)
        })
        .collect()
}

/// Band envelopes `[band][frame]` from the short-time power spectrum
fn band_envelopes(
    analyzer: &SpectrumAnalyzer,
    bands: &[std::ops::Range<usize>],
    samples: &[f64],
    hop: usize,
) -> Vec<Vec<f64>> {
    let mut envelopes = vec![Vec::new(); bands.len()];
    for start in frame_starts(samples.len(), analyzer.frame_len(), hop) {
        let spectrum = analyzer.power_spectrum(&samples[start..start + analyzer.frame_len()]);
        for (envelope, band) in envelopes.iter_mut().zip(bands.iter()) {
            envelope.push(spectrum[band.clone()].iter().sum::<f64>().sqrt());
        }
    }
    envelopes
}

/// Drop frames of both signals where `x` is more than `dyn_range` dB below
/// its loudest frame, then overlap-add the survivors
///
/// Returns `None` when `x` is too short to hold a single frame or no frame
/// has a finite energy.
fn remove_silent_frames(
    x: &[f64],
    y: &[f64],
    dyn_range: f64,
    frame_len: usize,
    hop: usize,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let window = hann_window(frame_len);
    let windowed = |signal: &[f64], start: usize| -> Vec<f64> {
        signal[start..start + frame_len]
            .iter()
            .zip(window.iter())
            .map(|(s, w)| s * w)
            .collect()
    };

    let starts: Vec<usize> = frame_starts(x.len(), frame_len, hop).collect();
    if starts.is_empty() {
        return None;
    }

    let x_frames: Vec<Vec<f64>> = starts.iter().map(|&s| windowed(x, s)).collect();
    let y_frames: Vec<Vec<f64>> = starts.iter().map(|&s| windowed(y, s)).collect();

    let energies: Vec<f64> = x_frames
        .iter()
        .map(|f| 20.0 * (l2_norm(f) + f64::EPSILON).log10())
        .collect();
    let max_energy = energies.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let keep: Vec<usize> = energies
        .iter()
        .enumerate()
        .filter(|&(_, &e)| max_energy - dyn_range - e < 0.0)
        .map(|(i, _)| i)
        .collect();
    if keep.is_empty() {
        return None;
    }

    let overlap_add = |frames: &[Vec<f64>]| -> Vec<f64> {
        let mut out = vec![0.0; (keep.len() - 1) * hop + frame_len];
        for (n, &i) in keep.iter().enumerate() {
            for (slot, v) in out[n * hop..n * hop + frame_len].iter_mut().zip(frames[i].iter()) {
                *slot += v;
            }
        }
        out
    };

    Some((overlap_add(&x_frames), overlap_add(&y_frames)))
}
