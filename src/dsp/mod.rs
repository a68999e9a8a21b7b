//! DSP Library
//!
//! Signal normalization, the adaptive Wiener filter, and the spectral
//! front-end helpers used by the metrics.

pub mod normalize;
pub mod resample;
pub mod spectrum;
pub mod wiener;

pub use normalize::{normalize, remove_dc};
pub use resample::resample;
pub use spectrum::{frame_starts, hann_window, SpectrumAnalyzer};
pub use wiener::{WienerFilter, DEFAULT_WINDOW_SIZE};

use crate::engine::Waveform;
use crate::error::Result;

/// A noise reduction stage of the pipeline
///
/// Implementations must return a waveform of the same length and sample
/// rate as their input.
pub trait Denoiser: Send + Sync {
    /// Produce a denoised copy of `input`
    fn denoise(&self, input: &Waveform) -> Result<Waveform>;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}
