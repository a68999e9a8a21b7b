//! Objective quality metrics
//!
//! One `MetricKind` per supported score. Error-style metrics (RMSE, SNR,
//! SI-SNR) are computed directly; perceptual quality and intelligibility are
//! opaque collaborators behind the `PerceptualQuality` and `Intelligibility`
//! traits.

pub mod basic;
pub mod pesq;
pub mod stoi;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

pub use basic::{rmse, si_snr, snr, SI_SNR_EPSILON};
pub use pesq::NarrowbandPesq;
pub use stoi::Stoi;

/// Score reported when the perceptual-quality algorithm fails
pub const PESQ_FAILURE_SENTINEL: f64 = -999.0;

/// Selectable metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Root-mean-square error (lower is better)
    #[default]
    Rmse,
    /// Signal-to-noise ratio in dB
    Snr,
    /// Narrowband perceptual quality (MOS-LQO)
    Pesq,
    /// Short-time objective intelligibility
    Stoi,
    /// Scale-invariant signal-to-noise ratio in dB
    #[serde(alias = "si-snr")]
    SiSnr,
}

impl MetricKind {
    /// All metric kinds in display order
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Rmse,
        MetricKind::Snr,
        MetricKind::Pesq,
        MetricKind::Stoi,
        MetricKind::SiSnr,
    ];

    /// Configuration tag for this metric
    pub fn tag(&self) -> &'static str {
        match self {
            MetricKind::Rmse => "rmse",
            MetricKind::Snr => "snr",
            MetricKind::Pesq => "pesq",
            MetricKind::Stoi => "stoi",
            MetricKind::SiSnr => "si_snr",
        }
    }

    /// Whether a failure of this metric is reported as the sentinel
    pub fn swallows_failures(&self) -> bool {
        matches!(self, MetricKind::Pesq)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MetricKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rmse" => Ok(MetricKind::Rmse),
            "snr" => Ok(MetricKind::Snr),
            "pesq" => Ok(MetricKind::Pesq),
            "stoi" => Ok(MetricKind::Stoi),
            "si_snr" | "si-snr" | "sisnr" => Ok(MetricKind::SiSnr),
            _ => Err(EvalError::UnknownMetric {
                name: s.to_string(),
            }),
        }
    }
}

/// Outcome of one metric computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricResult {
    /// A computed score; may be infinite or NaN for degenerate inputs
    Score(f64),
    /// The metric could not be computed; reported as the sentinel
    Unavailable { reason: String },
}

impl MetricResult {
    /// Scalar value, with `Unavailable` mapped to `PESQ_FAILURE_SENTINEL`
    pub fn value(&self) -> f64 {
        match self {
            MetricResult::Score(v) => *v,
            MetricResult::Unavailable { .. } => PESQ_FAILURE_SENTINEL,
        }
    }

    /// The score, if one was computed
    pub fn score(&self) -> Option<f64> {
        match self {
            MetricResult::Score(v) => Some(*v),
            MetricResult::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MetricResult::Score(_))
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricResult::Score(v) => write!(f, "{:.4}", v),
            MetricResult::Unavailable { reason } => {
                write!(f, "{} (unavailable: {})", PESQ_FAILURE_SENTINEL, reason)
            }
        }
    }
}

/// Perceptual speech quality estimator
///
/// Returns a MOS-like score for `degraded` judged against `reference`.
pub trait PerceptualQuality: Send + Sync {
    fn score(&self, reference: &[f64], degraded: &[f64], sample_rate: u32) -> Result<f64>;

    fn name(&self) -> &'static str;
}

/// Speech intelligibility estimator
///
/// Returns an intelligibility index for `processed` judged against `clean`.
pub trait Intelligibility: Send + Sync {
    fn score(&self, clean: &[f64], processed: &[f64], sample_rate: u32) -> Result<f64>;

    fn name(&self) -> &'static str;
}

/// Fail with `LengthMismatch` unless both signals have the same length
pub(crate) fn ensure_same_length(reference: &[f64], degraded: &[f64]) -> Result<()> {
    if reference.len() != degraded.len() {
        return Err(EvalError::LengthMismatch {
            reference: reference.len(),
            degraded: degraded.len(),
        });
    }
    Ok(())
}
