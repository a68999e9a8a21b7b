//! Integration Tests
//!
//! End-to-end tests for the denoise-and-score pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::{tempdir, TempDir};

use wiener_eval::dsp::normalize;
use wiener_eval::engine::{load_waveform, save_waveform, Waveform};
use wiener_eval::metrics::{rmse, si_snr, MetricKind, MetricResult};
use wiener_eval::pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
use wiener_eval::{EvalError, Result};

/// Gaussian noise via Box-Muller
fn gaussian_noise(len: usize, std: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let u1: f64 = rng.gen_range(0.0001_f64..1.0_f64);
            let u2: f64 = rng.gen_range(0.0_f64..1.0_f64);
            std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        })
        .collect()
}

struct Corpus {
    _dir: TempDir,
    noisy_dir: PathBuf,
    clean_dir: PathBuf,
    output_dir: PathBuf,
}

impl Corpus {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let noisy_dir = dir.path().join("noisy");
        let clean_dir = dir.path().join("clean");
        let output_dir = dir.path().join("filtered");
        fs::create_dir_all(&noisy_dir).unwrap();
        fs::create_dir_all(&clean_dir).unwrap();
        Self {
            _dir: dir,
            noisy_dir,
            clean_dir,
            output_dir,
        }
    }

    /// Write a clean tone and its noisy copy; returns both waveforms
    fn add_tone(&self, name: &str, secs: f64, noise_std: f64, seed: u64) -> (Waveform, Waveform) {
        let clean = Waveform::sine_wave(440.0, secs, 8000);
        let noise = gaussian_noise(clean.len(), noise_std, seed);
        let noisy = clean
            .with_samples(
                clean
                    .samples()
                    .iter()
                    .zip(noise.iter())
                    .map(|(s, n)| s + n)
                    .collect(),
            )
            .unwrap();

        save_waveform(&clean, &self.clean_dir.join(name)).unwrap();
        save_waveform(&noisy, &self.noisy_dir.join(name)).unwrap();
        (clean, noisy)
    }

    fn config(&self, name: &str, metric: MetricKind) -> PipelineConfig {
        PipelineConfig::new(self.noisy_dir.join(name), &self.clean_dir, &self.output_dir)
            .with_metric(metric)
    }
}

fn read_spec(path: &Path) -> hound::WavSpec {
    hound::WavReader::open(path).unwrap().spec()
}

fn run_file(config: &PipelineConfig) -> Result<PipelineOutcome> {
    Pipeline::default().run(config)
}

// === Scoring Tests ===

#[test]
fn test_filter_reduces_rmse() {
    let corpus = Corpus::new();
    let (clean, noisy) = corpus.add_tone("tone.wav", 1.0, 0.1, 7);

    let outcome = run_file(&corpus.config("tone.wav", MetricKind::Rmse)).unwrap();
    let filtered_rmse = outcome.result.score().unwrap();

    let baseline = rmse(
        normalize(&clean).unwrap().samples(),
        normalize(&noisy).unwrap().samples(),
    )
    .unwrap();

    assert!(
        filtered_rmse < baseline,
        "filtered RMSE {:.4} should be below the noisy baseline {:.4}",
        filtered_rmse,
        baseline
    );
}

#[test]
fn test_output_is_float_at_original_rate() {
    let corpus = Corpus::new();
    corpus.add_tone("tone.wav", 0.5, 0.05, 11);

    let outcome = run_file(&corpus.config("tone.wav", MetricKind::Snr)).unwrap();
    assert_eq!(outcome.output_path, corpus.output_dir.join("tone.wav"));

    let spec = read_spec(&outcome.output_path);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(spec.channels, 1);

    let written = load_waveform(&outcome.output_path).unwrap();
    assert_eq!(written.len(), 4000);
    assert!((written.peak() - 1.0).abs() < 1e-6);
    assert!(written.mean().abs() < 1e-6);
}

#[test]
fn test_missing_clean_reference() {
    let corpus = Corpus::new();
    corpus.add_tone("tone.wav", 0.5, 0.05, 3);
    fs::remove_file(corpus.clean_dir.join("tone.wav")).unwrap();

    let result = run_file(&corpus.config("tone.wav", MetricKind::Rmse));
    assert!(matches!(result, Err(EvalError::FileNotFound { .. })));
}

#[test]
fn test_missing_noisy_file() {
    let corpus = Corpus::new();
    let result = run_file(&corpus.config("absent.wav", MetricKind::Rmse));
    assert!(matches!(result, Err(EvalError::FileNotFound { .. })));
}

#[test]
fn test_short_file_gives_pesq_sentinel() {
    let corpus = Corpus::new();
    // 8000 samples: nothing is left after dropping the first 10000
    corpus.add_tone("short.wav", 1.0, 0.05, 5);

    let outcome = run_file(&corpus.config("short.wav", MetricKind::Pesq)).unwrap();
    assert!(matches!(outcome.result, MetricResult::Unavailable { .. }));
    assert_eq!(outcome.result.value(), -999.0);
}

#[test]
fn test_pesq_scores_long_file() {
    let corpus = Corpus::new();
    corpus.add_tone("long.wav", 3.0, 0.05, 9);

    let outcome = run_file(&corpus.config("long.wav", MetricKind::Pesq)).unwrap();
    let score = outcome.result.score().unwrap();
    assert!((1.0..=4.6).contains(&score), "MOS-LQO out of range: {}", score);
}

#[test]
fn test_pesq_scores_file_just_past_the_skip() {
    let corpus = Corpus::new();
    // 14000 samples: half a second remains after dropping the first 10000
    corpus.add_tone("brief.wav", 1.75, 0.05, 29);

    let outcome = run_file(&corpus.config("brief.wav", MetricKind::Pesq)).unwrap();
    let score = outcome.result.score().unwrap();
    assert!((1.0..=4.6).contains(&score), "MOS-LQO out of range: {}", score);
}

#[test]
fn test_stoi_in_range() {
    let corpus = Corpus::new();
    corpus.add_tone("tone.wav", 1.0, 0.1, 13);

    let outcome = run_file(&corpus.config("tone.wav", MetricKind::Stoi)).unwrap();
    let score = outcome.result.score().unwrap();
    assert!(score.is_finite());
    assert!(score <= 1.0 + 1e-9);
}

#[test]
fn test_si_snr_ignores_gain() {
    let corpus = Corpus::new();
    let (clean, noisy) = corpus.add_tone("tone.wav", 1.0, 0.1, 17);

    let outcome = run_file(&corpus.config("tone.wav", MetricKind::SiSnr)).unwrap();
    assert!(outcome.result.score().unwrap().is_finite());

    let quiet: Vec<f64> = noisy.samples().iter().map(|s| s * 0.25).collect();
    let a = si_snr(clean.samples(), noisy.samples()).unwrap();
    let b = si_snr(clean.samples(), &quiet).unwrap();
    approx::assert_relative_eq!(a, b, epsilon = 1e-6);
}

#[test]
fn test_visualize_writes_svg() {
    let corpus = Corpus::new();
    corpus.add_tone("tone.wav", 0.5, 0.1, 19);

    let config = corpus
        .config("tone.wav", MetricKind::Rmse)
        .with_visualize(true);
    let outcome = Pipeline::default().run(&config).unwrap();

    let plot = outcome.plot_path.unwrap();
    assert_eq!(plot, corpus.output_dir.join("tone.svg"));
    let svg = fs::read_to_string(plot).unwrap();
    assert!(svg.contains("mixed signal"));
    assert!(svg.contains("filtered signal"));
}

#[test]
fn test_output_directory_is_created() {
    let corpus = Corpus::new();
    corpus.add_tone("tone.wav", 0.5, 0.1, 23);
    assert!(!corpus.output_dir.exists());

    run_file(&corpus.config("tone.wav", MetricKind::Rmse)).unwrap();
    assert!(corpus.output_dir.is_dir());
}
