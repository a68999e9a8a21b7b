//! Denoise-and-score pipeline
//!
//! Runs one noisy recording through normalization, denoising and a single
//! metric:
//! 1. Load and normalize the noisy recording
//! 2. Denoise, then normalize the result
//! 3. Save it to the output directory under the same basename
//! 4. Load and normalize the same-named clean reference
//! 5. Score the selected metric
//!
//! A comparison plot is written afterwards when requested.

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::Serialize;

use crate::dsp::{normalize, Denoiser, WienerFilter};
use crate::engine::{load_waveform, save_waveform, Waveform};
use crate::error::{EvalError, Result};
use crate::metrics::{
    rmse, si_snr, snr, Intelligibility, MetricKind, MetricResult, NarrowbandPesq,
    PerceptualQuality, Stoi,
};
use crate::visualize::save_comparison_plot;

/// Leading samples dropped from both signals before perceptual scoring
pub const PESQ_SKIP_SAMPLES: usize = 10_000;

/// Per-invocation settings for one file
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Noisy input recording
    pub filename: PathBuf,
    /// Directory holding the clean references
    pub clean_path: PathBuf,
    /// Directory receiving the filtered recording
    pub output: PathBuf,
    pub metrics: MetricKind,
    pub visualize: bool,
}

impl PipelineConfig {
    pub fn new(
        filename: impl Into<PathBuf>,
        clean_path: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filename: filename.into(),
            clean_path: clean_path.into(),
            output: output.into(),
            metrics: MetricKind::default(),
            visualize: false,
        }
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metrics = metric;
        self
    }

    pub fn with_visualize(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }
}

/// What one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub metric: MetricKind,
    pub result: MetricResult,
    /// Where the filtered recording was written
    pub output_path: PathBuf,
    /// Comparison plot, when one was requested and written
    pub plot_path: Option<PathBuf>,
    pub sample_rate: u32,
    pub num_samples: usize,
}

/// Denoise-and-score pipeline
///
/// Owns the denoiser and the two opaque metric collaborators.
pub struct Pipeline {
    denoiser: Box<dyn Denoiser>,
    perceptual: Box<dyn PerceptualQuality>,
    intelligibility: Box<dyn Intelligibility>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            denoiser: Box::new(WienerFilter::default()),
            perceptual: Box::new(NarrowbandPesq::new()),
            intelligibility: Box::new(Stoi::new()),
        }
    }
}

impl Pipeline {
    /// Pipeline with the default metric collaborators and the given denoiser
    pub fn new(denoiser: Box<dyn Denoiser>) -> Self {
        Self::default().with_denoiser(denoiser)
    }

    pub fn with_denoiser(mut self, denoiser: Box<dyn Denoiser>) -> Self {
        self.denoiser = denoiser;
        self
    }

    pub fn with_perceptual_quality(mut self, perceptual: Box<dyn PerceptualQuality>) -> Self {
        self.perceptual = perceptual;
        self
    }

    pub fn with_intelligibility(mut self, intelligibility: Box<dyn Intelligibility>) -> Self {
        self.intelligibility = intelligibility;
        self
    }

    pub fn denoiser_name(&self) -> &'static str {
        self.denoiser.name()
    }

    /// Run the pipeline on one file
    pub fn run(&self, config: &PipelineConfig) -> Result<PipelineOutcome> {
        let basename = config
            .filename
            .file_name()
            .ok_or_else(|| EvalError::InvalidParameter {
                param: "filename".to_string(),
                value: config.filename.display().to_string(),
                expected: "a path to a file".to_string(),
            })?;

        info!(
            "Processing {} ({}, metric {})",
            config.filename.display(),
            self.denoiser.name(),
            config.metrics
        );

        let mixed = load_waveform(&config.filename)?;
        let noisy = normalize(&mixed)?;
        let filtered = normalize(&self.denoiser.denoise(&noisy)?)?;

        if !config.output.exists() {
            debug!("Creating output directory {}", config.output.display());
            fs::create_dir_all(&config.output)?;
        }
        let output_path = config.output.join(basename);
        save_waveform(&filtered, &output_path)?;
        debug!("Wrote filtered recording to {}", output_path.display());

        let clean = normalize(&load_waveform(&config.clean_path.join(basename))?)?;
        if clean.sample_rate() != noisy.sample_rate() {
            warn!(
                "Clean reference is at {} Hz but the noisy recording is at {} Hz; scoring at {} Hz",
                clean.sample_rate(),
                noisy.sample_rate(),
                noisy.sample_rate()
            );
        }

        let result = self.score(config.metrics, &noisy, &filtered, &clean)?;
        info!("{} = {}", config.metrics, result);

        let plot_path = if config.visualize {
            self.write_plot(config, &mixed, &filtered)
        } else {
            None
        };

        Ok(PipelineOutcome {
            metric: config.metrics,
            result,
            output_path,
            plot_path,
            sample_rate: filtered.sample_rate(),
            num_samples: filtered.len(),
        })
    }

    /// Compute one metric on already-normalized signals
    ///
    /// Intelligibility compares the filtered signal against the normalized
    /// noisy input; every other metric compares it against the clean reference.
    pub fn score(
        &self,
        metric: MetricKind,
        noisy: &Waveform,
        filtered: &Waveform,
        clean: &Waveform,
    ) -> Result<MetricResult> {
        let sample_rate = noisy.sample_rate();

        let value = match metric {
            MetricKind::Rmse => rmse(clean.samples(), filtered.samples()),
            MetricKind::Snr => snr(clean.samples(), filtered.samples()),
            MetricKind::SiSnr => si_snr(clean.samples(), filtered.samples()),
            MetricKind::Stoi => {
                self.intelligibility
                    .score(noisy.samples(), filtered.samples(), sample_rate)
            }
            MetricKind::Pesq => self.perceptual.score(
                clean.skip(PESQ_SKIP_SAMPLES),
                filtered.skip(PESQ_SKIP_SAMPLES),
                sample_rate,
            ),
        };

        match value {
            Ok(value) => Ok(MetricResult::Score(value)),
            Err(e) if metric.swallows_failures() => {
                warn!("{} failed: {}", metric, e);
                Ok(MetricResult::Unavailable {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn write_plot(
        &self,
        config: &PipelineConfig,
        mixed: &Waveform,
        filtered: &Waveform,
    ) -> Option<PathBuf> {
        let stem = config
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plot".to_string());
        let plot_path = config.output.join(format!("{}.svg", stem));

        match save_comparison_plot(&plot_path, mixed, filtered) {
            Ok(()) => {
                debug!("Wrote comparison plot to {}", plot_path.display());
                Some(plot_path)
            }
            Err(e) => {
                warn!("Could not write plot {}: {}", plot_path.display(), e);
                None
            }
        }
    }
}
