//! Short-time spectral analysis
//!
//! Windowed real FFT helpers shared by the perceptual and intelligibility
//! metrics.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Hann window of `len` points without the zero end points
///
/// Equivalent to taking the interior of a `len + 2` point symmetric Hann
/// window.
pub fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|k| {
            0.5 - 0.5 * (2.0 * std::f64::consts::PI * (k + 1) as f64 / (len + 1) as f64).cos()
        })
        .collect()
}

/// Start offsets of full frames; the final partial position is excluded
pub fn frame_starts(len: usize, frame_len: usize, hop: usize) -> impl Iterator<Item = usize> {
    let end = len.saturating_sub(frame_len);
    (0..end).step_by(hop.max(1))
}

/// Windowed power spectrum of fixed-size frames
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    window: Vec<f64>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for `frame_len`-sample Hann frames zero padded to `fft_size`
    pub fn new(frame_len: usize, fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            fft_size,
            window: hann_window(frame_len),
        }
    }

    /// Number of one-sided bins (`fft_size / 2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frame length in samples
    pub fn frame_len(&self) -> usize {
        self.window.len()
    }

    /// Sum of squared window coefficients
    pub fn window_energy(&self) -> f64 {
        self.window.iter().map(|w| w * w).sum()
    }

    /// One-sided power spectrum `|X[k]|^2` of a windowed frame
    ///
    /// `frame` shorter than the window is zero extended.
    pub fn power_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); self.fft_size];
        for ((slot, &sample), &w) in buffer.iter_mut().zip(frame.iter()).zip(self.window.iter()) {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process(&mut buffer);

        buffer
            .iter()
            .take(self.num_bins())
            .map(|c| c.norm_sqr())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_window_is_symmetric_and_nonzero() {
        let w = hann_window(4);
        assert_eq!(w.len(), 4);
        assert!(w.iter().all(|&v| v > 0.0));
        assert_relative_eq!(w[0], w[3], epsilon = 1e-12);
        assert_relative_eq!(w[1], w[2], epsilon = 1e-12);
        // interior of a 6-point window: 0.5 - 0.5cos(2pi/5)
        assert_relative_eq!(w[0], 0.345491502812526, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_starts_excludes_tail() {
        let starts: Vec<usize> = frame_starts(10, 4, 2).collect();
        assert_eq!(starts, vec![0, 2, 4]);
        assert_eq!(frame_starts(3, 4, 2).count(), 0);
    }

    #[test]
    fn test_power_spectrum_peak_at_tone_bin() {
        let analyzer = SpectrumAnalyzer::new(256, 256);
        // 1000 Hz at 8000 Hz lands exactly on bin 32
        let frame: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 8000.0).sin())
            .collect();
        let spectrum = analyzer.power_spectrum(&frame);

        assert_eq!(spectrum.len(), 129);
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 32);
    }
}
