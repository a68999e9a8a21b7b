//! Wiener Eval CLI
//!
//! Denoise speech recordings with an adaptive Wiener filter and score the
//! result against clean references.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use wiener_eval::cli::commands::{self, BatchArgs};
use wiener_eval::cli::{Cli, Commands};
use wiener_eval::config::EvalConfig;
use wiener_eval::pipeline::PipelineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Wiener Eval v{}", env!("CARGO_PKG_VERSION"));

    let file_config = match &cli.config {
        Some(path) => EvalConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EvalConfig::default(),
    };
    debug!("Configuration: {:?}", file_config);

    handle_command(cli.command, &file_config, cli.json)
}

fn handle_command(cmd: Commands, file_config: &EvalConfig, json: bool) -> Result<()> {
    match cmd {
        Commands::Score {
            filename,
            clean_path,
            output,
            metrics,
            visualize,
            filter,
        } => {
            let config = PipelineConfig::new(&filename, clean_path, output)
                .with_metric(metrics)
                .with_visualize(visualize);
            commands::score(file_config, &config, &filter, json)
                .with_context(|| format!("Failed to score {}", filename.display()))?;
        }
        Commands::Batch {
            input_dir,
            clean_dir,
            output_dir,
            metrics,
            fail_fast,
            filter,
        } => {
            let args = BatchArgs {
                input_dir,
                clean_dir,
                output_dir,
                metrics,
                fail_fast,
            };
            commands::batch(file_config, args, &filter, json).context("Batch run failed")?;
        }
    }
    Ok(())
}
