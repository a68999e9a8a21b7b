//! Evaluation configuration file
//!
//! Optional JSON file holding filter settings and batch directories.
//! Command-line flags override whatever is loaded here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dsp::{WienerFilter, DEFAULT_WINDOW_SIZE};
use crate::error::{EvalError, Result};
use crate::metrics::MetricKind;

/// Wiener filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Window size in samples (odd)
    pub window_size: usize,
    /// Explicit noise power; estimated from the signal when absent
    pub noise: Option<f64>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            noise: None,
        }
    }
}

impl FilterSettings {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(EvalError::InvalidParameter {
                param: "window_size".to_string(),
                value: self.window_size.to_string(),
                expected: "an odd number of samples".to_string(),
            });
        }
        if let Some(noise) = self.noise {
            if !(noise >= 0.0 && noise.is_finite()) {
                return Err(EvalError::InvalidParameter {
                    param: "noise".to_string(),
                    value: noise.to_string(),
                    expected: "a finite non-negative power".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the filter these settings describe
    pub fn build(&self) -> Result<WienerFilter> {
        WienerFilter::new(self.window_size, self.noise)
    }
}

/// Directories and metric for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub input_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_batch_metric")]
    pub metric: MetricKind,
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_batch_metric() -> MetricKind {
    MetricKind::Pesq
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub batch: Option<BatchSettings>,
}

impl EvalConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EvalError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config: EvalConfig =
            serde_json::from_str(&content).map_err(|e| EvalError::ConfigError {
                details: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()
    }
}
