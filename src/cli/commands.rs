//! CLI Command Implementations
//!
//! Merges the optional configuration file with command-line flags and runs
//! the pipeline or the batch driver.

use std::path::PathBuf;

use log::info;

use crate::batch::{run_batch, BatchConfig, BatchSummary};
use crate::cli::FilterArgs;
use crate::config::{EvalConfig, FilterSettings};
use crate::error::{EvalError, Result};
use crate::metrics::MetricKind;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutcome};

/// Command-line batch flags, each overriding the configuration file
#[derive(Debug, Clone, Default)]
pub struct BatchArgs {
    pub input_dir: Option<PathBuf>,
    pub clean_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub metrics: Option<MetricKind>,
    pub fail_fast: bool,
}

/// Filter settings from the file with command-line overrides applied
pub fn resolve_filter(file: &FilterSettings, args: &FilterArgs) -> Result<FilterSettings> {
    let settings = FilterSettings {
        window_size: args.window_size.unwrap_or(file.window_size),
        noise: args.noise.or(file.noise),
    };
    settings.validate()?;
    Ok(settings)
}

/// Batch settings from the file with command-line overrides applied
pub fn resolve_batch(file: &EvalConfig, args: BatchArgs) -> Result<BatchConfig> {
    let from_file = file.batch.clone();

    let pick = |flag: Option<PathBuf>, fallback: Option<PathBuf>, name: &str| {
        flag.or(fallback).ok_or_else(|| EvalError::ConfigError {
            details: format!("--{} is required when the config file has no batch section", name),
        })
    };

    let input_dir = pick(
        args.input_dir,
        from_file.as_ref().map(|b| b.input_dir.clone()),
        "input-dir",
    )?;
    let clean_dir = pick(
        args.clean_dir,
        from_file.as_ref().map(|b| b.clean_dir.clone()),
        "clean-dir",
    )?;
    let output_dir = pick(
        args.output_dir,
        from_file.as_ref().map(|b| b.output_dir.clone()),
        "output-dir",
    )?;
    let metric = args
        .metrics
        .or(from_file.as_ref().map(|b| b.metric))
        .unwrap_or(MetricKind::Pesq);
    let fail_fast = args.fail_fast || from_file.map(|b| b.fail_fast).unwrap_or(false);

    Ok(BatchConfig::new(input_dir, clean_dir, output_dir)
        .with_metric(metric)
        .with_fail_fast(fail_fast))
}

fn build_pipeline(settings: &FilterSettings) -> Result<Pipeline> {
    let filter = settings.build()?;
    info!(
        "Wiener filter: window {}, noise {}",
        filter.window_size(),
        filter
            .noise()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "estimated".to_string())
    );
    Ok(Pipeline::new(Box::new(filter)))
}

/// Denoise and score one file.
pub fn score(
    file_config: &EvalConfig,
    config: &PipelineConfig,
    filter: &FilterArgs,
    json: bool,
) -> Result<PipelineOutcome> {
    let settings = resolve_filter(&file_config.filter, filter)?;
    let pipeline = build_pipeline(&settings)?;

    let outcome = pipeline.run(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}: {}", outcome.metric, outcome.result.value());
        println!("Filtered output: {}", outcome.output_path.display());
        if let Some(plot) = &outcome.plot_path {
            println!("Plot: {}", plot.display());
        }
    }

    Ok(outcome)
}

/// Denoise and score a directory of files, printing the average.
pub fn batch(
    file_config: &EvalConfig,
    args: BatchArgs,
    filter: &FilterArgs,
    json: bool,
) -> Result<BatchSummary> {
    let settings = resolve_filter(&file_config.filter, filter)?;
    let config = resolve_batch(file_config, args)?;
    let pipeline = build_pipeline(&settings)?;

    let summary = run_batch(&pipeline, &config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !summary.failures.is_empty() {
        println!("{} file(s) failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("  {} [{}] {}", failure.file.display(), failure.code, failure.message);
        }
    }
    summary.require_mean()?;

    Ok(summary)
}
