//! Waveform Management
//!
//! Provides the core waveform type and the sample statistics shared by the
//! normalizer, the filter and the metrics. Samples are held as `f64` so that
//! metric accumulation does not lose precision on long recordings.

use crate::error::{EvalError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Arithmetic mean of a sample slice. Returns 0.0 for an empty slice.
pub fn calculate_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Maximum absolute sample value. Returns 0.0 for an empty slice.
pub fn calculate_peak(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0_f64, f64::max)
}

/// Inner product of two slices over their common length
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Convert a power ratio to decibels
///
/// Zero yields `-inf` and infinity yields `+inf`, matching IEEE semantics.
#[inline]
pub fn power_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Convert linear amplitude to decibels
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Waveform
// ============================================================================

/// Mono audio samples with their sample rate
///
/// The sample rate travels unchanged through normalization and filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Waveform {
    /// Create a waveform, rejecting an empty sample vector
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(EvalError::EmptyWaveform);
        }
        if sample_rate == 0 {
            return Err(EvalError::InvalidParameter {
                param: "sample_rate".to_string(),
                value: "0".to_string(),
                expected: "a positive rate in Hz".to_string(),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a sine wave test tone with unit amplitude
    pub fn sine_wave(frequency: f64, duration_secs: f64, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f64) as usize;
        let angular_freq = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;
        let samples = (0..num_samples)
            .map(|i| (angular_freq * i as f64).sin())
            .collect();

        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a waveform sharing this one's sample rate
    ///
    /// Used by processing stages so the rate cannot drift.
    pub fn with_samples(&self, samples: Vec<f64>) -> Result<Self> {
        Self::new(samples, self.sample_rate)
    }

    /// Get a reference to the samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed waveform; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Mean sample value (DC offset)
    pub fn mean(&self) -> f64 {
        calculate_mean(&self.samples)
    }

    /// Maximum absolute sample value
    pub fn peak(&self) -> f64 {
        calculate_peak(&self.samples)
    }

    /// Samples after dropping the first `count`
    ///
    /// Yields an empty slice when the waveform is not longer than `count`.
    pub fn skip(&self, count: usize) -> &[f64] {
        self.samples.get(count..).unwrap_or(&[])
    }
}
