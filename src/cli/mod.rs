//! CLI Module
//!
//! Command-line interface for the Wiener filter evaluation tool.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::metrics::MetricKind;

/// Wiener Eval - denoise speech recordings and score them against clean references
#[derive(Parser, Debug)]
#[command(name = "wiener-eval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file with filter and batch settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the final result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Wiener filter overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Wiener window size in samples (odd)
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Noise power; estimated from the signal when omitted
    #[arg(long)]
    pub noise: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Denoise one recording and score it
    #[command(name = "score")]
    Score {
        /// Noisy input recording
        #[arg(long)]
        filename: PathBuf,

        /// Directory holding the clean references
        #[arg(long)]
        clean_path: PathBuf,

        /// Directory receiving the filtered recording
        #[arg(long)]
        output: PathBuf,

        /// Metric to compute: rmse, snr, pesq, stoi or si_snr (case-insensitive)
        #[arg(long, default_value_t = MetricKind::Rmse)]
        metrics: MetricKind,

        /// Write a mixed vs. filtered waveform plot next to the output
        #[arg(long)]
        visualize: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Denoise and score every recording in a directory
    #[command(name = "batch")]
    Batch {
        /// Directory of noisy recordings
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory of clean references
        #[arg(long)]
        clean_dir: Option<PathBuf>,

        /// Directory receiving the filtered recordings
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Metric to compute: rmse, snr, pesq, stoi or si_snr [default: pesq]
        #[arg(long)]
        metrics: Option<MetricKind>,

        /// Abort on the first failing file
        #[arg(long)]
        fail_fast: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_score_defaults() {
        let cli = Cli::parse_from([
            "wiener-eval",
            "score",
            "--filename",
            "noisy/a.wav",
            "--clean-path",
            "clean",
            "--output",
            "out",
        ]);
        match cli.command {
            Commands::Score {
                metrics,
                visualize,
                filter,
                ..
            } => {
                assert_eq!(metrics, MetricKind::Rmse);
                assert!(!visualize);
                assert_eq!(filter.window_size, None);
            }
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn test_batch_flags() {
        let cli = Cli::parse_from([
            "wiener-eval",
            "--verbose",
            "batch",
            "--input-dir",
            "noisy",
            "--metrics",
            "si-snr",
            "--fail-fast",
            "--window-size",
            "5",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Batch {
                input_dir,
                metrics,
                fail_fast,
                filter,
                ..
            } => {
                assert_eq!(input_dir, Some(PathBuf::from("noisy")));
                assert_eq!(metrics, Some(MetricKind::SiSnr));
                assert!(fail_fast);
                assert_eq!(filter.window_size, Some(5));
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_metric_flag_ignores_case() {
        let cli = Cli::parse_from([
            "wiener-eval",
            "score",
            "--filename",
            "a.wav",
            "--clean-path",
            "clean",
            "--output",
            "out",
            "--metrics",
            "PESQ",
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Score { metrics, .. } => assert_eq!(metrics, MetricKind::Pesq),
            _ => panic!("expected score"),
        }

        let cli = Cli::parse_from(["wiener-eval", "batch", "--metrics", "Si_SNR"]);
        match cli.command {
            Commands::Batch { metrics, .. } => assert_eq!(metrics, Some(MetricKind::SiSnr)),
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result = Cli::try_parse_from([
            "wiener-eval",
            "score",
            "--filename",
            "a.wav",
            "--clean-path",
            "clean",
            "--output",
            "out",
            "--metrics",
            "mos",
        ]);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Unknown metric: mos"), "{}", message);
    }
}
