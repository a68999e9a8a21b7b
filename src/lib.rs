//! Wiener Eval - Denoise-and-Score Evaluation for Speech Recordings
//!
//! Runs noisy speech recordings through an adaptive Wiener filter and scores
//! the result against clean references with one of several objective
//! metrics (RMSE, SNR, SI-SNR, perceptual quality, intelligibility).
//!
//! # Architecture
//!
//! - `engine`: waveform type and WAV I/O
//! - `dsp`: normalization, the Wiener filter and spectral helpers
//! - `metrics`: metric selection and computation
//! - `pipeline`: the single-file denoise-and-score flow
//! - `batch`: directory driver with score averaging

pub mod batch;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod visualize;

pub use error::{EvalError, Result};
