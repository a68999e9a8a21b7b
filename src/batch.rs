//! Batch driver
//!
//! Runs the pipeline over every `.wav` file directly inside an input
//! directory and averages the collected scores. Perceptual-quality failures
//! arrive as `MetricResult::Unavailable` and are skipped, never averaged.
//! Errors confined to one input file are recorded and the run moves on;
//! anything else, such as an unwritable output directory, ends the run.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{EvalError, Result};
use crate::metrics::{MetricKind, MetricResult};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Settings for one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub output_dir: PathBuf,
    pub metric: MetricKind,
    /// Abort on the first failing file instead of recording it and moving on
    pub fail_fast: bool,
}

impl BatchConfig {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        clean_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            clean_dir: clean_dir.into(),
            output_dir: output_dir.into(),
            metric: MetricKind::Pesq,
            fail_fast: false,
        }
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Running sum and count of collected scores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreAccumulator {
    sum: f64,
    count: usize,
    skipped: usize,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one result; returns `false` when it was skipped
    pub fn push(&mut self, result: &MetricResult) -> bool {
        match result.score() {
            Some(value) => {
                self.sum += value;
                self.count += 1;
                true
            }
            None => {
                self.skipped += 1;
                false
            }
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Arithmetic mean of collected scores, `None` when nothing was collected
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// A file that could not be scored
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub code: &'static str,
    pub message: String,
}

/// Result of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Files whose score entered the mean
    pub scored: usize,
    /// Files whose metric was unavailable
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
    pub mean: Option<f64>,
}

impl BatchSummary {
    /// The mean score, or `NoScores` when nothing was collected
    pub fn require_mean(&self) -> Result<f64> {
        self.mean.ok_or(EvalError::NoScores)
    }
}

/// Regular `.wav` files directly inside `dir`, sorted by name
pub fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_wav = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Run `pipeline` over every file in the batch
pub fn run_batch(pipeline: &Pipeline, config: &BatchConfig) -> Result<BatchSummary> {
    if !config.input_dir.is_dir() {
        return Err(EvalError::FileNotFound {
            path: config.input_dir.display().to_string(),
        });
    }

    let files = list_wav_files(&config.input_dir)?;
    info!(
        "Scoring {} files from {} ({} filter, metric {})",
        files.len(),
        config.input_dir.display(),
        pipeline.denoiser_name(),
        config.metric
    );

    let mut accumulator = ScoreAccumulator::new();
    let mut failures = Vec::new();
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        let display_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        let pipeline_config = PipelineConfig::new(file, &config.clean_dir, &config.output_dir)
            .with_metric(config.metric);

        match pipeline.run(&pipeline_config) {
            Ok(outcome) => {
                println!("[{}/{}] {}: {}", i + 1, total, display_name, outcome.result.value());
                if !accumulator.push(&outcome.result) {
                    warn!("Skipping {} from the average", display_name);
                }
            }
            Err(e) if config.fail_fast => {
                error!("{} failed: {}", display_name, e);
                return Err(e);
            }
            Err(e) if !e.is_recoverable() => {
                error!(
                    "{} failed [{}], aborting the batch: {}",
                    display_name,
                    e.error_code(),
                    e
                );
                return Err(e);
            }
            Err(e) => {
                println!("[{}/{}] {}: failed ({})", i + 1, total, display_name, e);
                warn!("{} [{}]: {}", display_name, e.error_code(), e.recovery_hint());
                failures.push(FileFailure {
                    file: file.clone(),
                    code: e.error_code(),
                    message: e.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary {
        scored: accumulator.count(),
        skipped: accumulator.skipped(),
        failures,
        mean: accumulator.mean(),
    };

    match summary.mean {
        Some(mean) => println!("Average {}: {}", config.metric, mean),
        None => println!("Average {}: no scores collected", config.metric),
    }
    info!(
        "Batch done: {} scored, {} skipped, {} failed",
        summary.scored,
        summary.skipped,
        summary.failures.len()
    );

    Ok(summary)
}
