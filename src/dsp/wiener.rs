//! Adaptive Wiener filter
//!
//! Local-statistics Wiener filter: each output sample is estimated from the
//! mean and variance of a centred window around it. Windows are zero padded
//! at the edges and always divided by the full window size, so the first and
//! last `window_size / 2` samples are pulled towards zero.

use log::debug;

use crate::dsp::Denoiser;
use crate::engine::buffer::{calculate_mean, Waveform};
use crate::error::{EvalError, Result};

/// Default window size in samples
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Local-mean / local-variance Wiener filter
#[derive(Debug, Clone, PartialEq)]
pub struct WienerFilter {
    window_size: usize,
    noise: Option<f64>,
}

impl WienerFilter {
    /// Create a filter with an odd window size and an optional noise power
    ///
    /// When `noise` is `None` it is estimated per signal as the mean of all
    /// local variances.
    pub fn new(window_size: usize, noise: Option<f64>) -> Result<Self> {
        if window_size == 0 || window_size % 2 == 0 {
            return Err(EvalError::InvalidParameter {
                param: "window_size".to_string(),
                value: window_size.to_string(),
                expected: "an odd number of samples".to_string(),
            });
        }
        if let Some(n) = noise {
            if !(n >= 0.0 && n.is_finite()) {
                return Err(EvalError::InvalidParameter {
                    param: "noise".to_string(),
                    value: n.to_string(),
                    expected: "a finite non-negative power".to_string(),
                });
            }
        }
        Ok(Self { window_size, noise })
    }

    /// Window size in samples
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Explicit noise power, if one was configured
    pub fn noise(&self) -> Option<f64> {
        self.noise
    }

    /// Filter a raw sample slice, returning a vector of the same length
    pub fn filter(&self, samples: &[f64]) -> Vec<f64> {
        let local_mean = windowed_mean(samples, self.window_size, |x| x);
        let local_power = windowed_mean(samples, self.window_size, |x| x * x);
        let local_var: Vec<f64> = local_power
            .iter()
            .zip(local_mean.iter())
            .map(|(p, m)| p - m * m)
            .collect();

        let noise = self.noise.unwrap_or_else(|| calculate_mean(&local_var));
        debug!(
            "Wiener filter: window {}, noise power {:.6e}",
            self.window_size, noise
        );

        samples
            .iter()
            .zip(local_mean.iter().zip(local_var.iter()))
            .map(|(&x, (&mean, &var))| {
                if var < noise || var <= 0.0 {
                    mean
                } else {
                    mean + (1.0 - noise / var) * (x - mean)
                }
            })
            .collect()
    }
}

impl Default for WienerFilter {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            noise: None,
        }
    }
}

impl Denoiser for WienerFilter {
    fn denoise(&self, input: &Waveform) -> Result<Waveform> {
        input.with_samples(self.filter(input.samples()))
    }

    fn name(&self) -> &'static str {
        "wiener"
    }
}

/// Zero-padded centred moving average of `f(x)`
fn windowed_mean(samples: &[f64], window_size: usize, f: impl Fn(f64) -> f64) -> Vec<f64> {
    let n = samples.len();
    let half = window_size / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in samples {
        acc += f(x);
        prefix.push(acc);
    }

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            (prefix[end] - prefix[start]) / window_size as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_even_window() {
        assert!(WienerFilter::new(4, None).is_err());
        assert!(WienerFilter::new(0, None).is_err());
        assert!(WienerFilter::new(5, None).is_ok());
    }

    #[test]
    fn test_rejects_negative_noise() {
        assert!(WienerFilter::new(3, Some(-1.0)).is_err());
        assert!(WienerFilter::new(3, Some(f64::NAN)).is_err());
        assert!(WienerFilter::new(3, Some(0.0)).is_ok());
    }

    #[test]
    fn test_windowed_mean_zero_pads_edges() {
        let mean = windowed_mean(&[3.0, 3.0, 3.0, 3.0], 3, |x| x);
        assert_relative_eq!(mean[0], 2.0);
        assert_relative_eq!(mean[1], 3.0);
        assert_relative_eq!(mean[2], 3.0);
        assert_relative_eq!(mean[3], 2.0);
    }

    #[test]
    fn test_known_output() {
        // local means: [1, 1, 3, 7/3], local vars: [2/3, 2/3, 26/3, 98/9]
        let filter = WienerFilter::new(3, Some(1.0)).unwrap();
        let out = filter.filter(&[1.0, 2.0, 0.0, 7.0]);

        assert_eq!(out.len(), 4);
        assert_relative_eq!(out[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 1.0, epsilon = 1e-12);

        let var2 = 53.0 / 3.0 - 9.0;
        assert_relative_eq!(out[2], 3.0 + (1.0 - 1.0 / var2) * (0.0 - 3.0), epsilon = 1e-12);

        let mean3 = 7.0 / 3.0;
        let var3 = 49.0 / 3.0 - mean3 * mean3;
        assert_relative_eq!(out[3], mean3 + (1.0 - 1.0 / var3) * (7.0 - mean3), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_noise_is_identity_where_variance_positive() {
        let filter = WienerFilter::new(3, Some(0.0)).unwrap();
        let input = [0.1, -0.4, 0.9, 0.2, -0.7];
        let out = filter.filter(&input);
        for (a, b) in input.iter().zip(out.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_denoise_preserves_rate_and_length() {
        let tone = Waveform::sine_wave(440.0, 0.25, 8000);
        let filtered = WienerFilter::default().denoise(&tone).unwrap();

        assert_eq!(filtered.len(), tone.len());
        assert_eq!(filtered.sample_rate(), 8000);
        assert!(filtered.samples().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_constant_input_stays_finite() {
        let out = WienerFilter::default().filter(&[0.0; 16]);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
