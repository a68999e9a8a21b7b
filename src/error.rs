//! Error handling for Wiener Eval
//!
//! Every failure carries a stable error code and a recovery hint so the
//! batch driver can decide whether a file may be skipped.

use thiserror::Error;

/// Result type alias for Wiener Eval operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Main error type for Wiener Eval operations
#[derive(Error, Debug)]
pub enum EvalError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read audio file: {path}")]
    AudioReadError {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWriteError {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported audio format: {details}")]
    UnsupportedFormat { details: String },

    // Signal Errors
    #[error("Waveform contains no samples")]
    EmptyWaveform,

    #[error("Waveform is silent after DC removal; cannot normalize")]
    SilentWaveform,

    #[error("Length mismatch: reference has {reference} samples, degraded has {degraded}")]
    LengthMismatch { reference: usize, degraded: usize },

    // Metric Errors
    #[error("{metric} does not support a sample rate of {sample_rate} Hz")]
    UnsupportedSampleRate {
        metric: &'static str,
        sample_rate: u32,
    },

    #[error("{metric} buffer too short: {samples} samples (minimum {required})")]
    BufferTooShort {
        metric: &'static str,
        samples: usize,
        required: usize,
    },

    #[error("No utterances detected in the reference signal")]
    NoUtterances,

    #[error("Resampling failed: {details}")]
    Resample { details: String },

    // Configuration Errors
    #[error("Invalid parameter: {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Unknown metric: {name} (expected rmse, snr, pesq, stoi or si_snr)")]
    UnknownMetric { name: String },

    #[error("Configuration error: {details}")]
    ConfigError { details: String },

    // Batch Errors
    #[error("No scores were collected; cannot compute an average")]
    NoScores,

    #[error("Directory walk failed: {0}")]
    DirectoryWalk(#[from] walkdir::Error),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EvalError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EvalError::FileNotFound { .. } => "FILE_NOT_FOUND",
            EvalError::AudioReadError { .. } => "AUDIO_READ_ERROR",
            EvalError::AudioWriteError { .. } => "AUDIO_WRITE_ERROR",
            EvalError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EvalError::EmptyWaveform => "EMPTY_WAVEFORM",
            EvalError::SilentWaveform => "SILENT_WAVEFORM",
            EvalError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            EvalError::UnsupportedSampleRate { .. } => "UNSUPPORTED_SAMPLE_RATE",
            EvalError::BufferTooShort { .. } => "BUFFER_TOO_SHORT",
            EvalError::NoUtterances => "NO_UTTERANCES",
            EvalError::Resample { .. } => "RESAMPLE_ERROR",
            EvalError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EvalError::UnknownMetric { .. } => "UNKNOWN_METRIC",
            EvalError::ConfigError { .. } => "CONFIG_ERROR",
            EvalError::NoScores => "NO_SCORES",
            EvalError::DirectoryWalk(_) => "DIRECTORY_WALK_ERROR",
            EvalError::Io(_) => "IO_ERROR",
            EvalError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is confined to a single input file
    ///
    /// The batch driver records recoverable failures and keeps going; any
    /// other error aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvalError::FileNotFound { .. }
                | EvalError::AudioReadError { .. }
                | EvalError::UnsupportedFormat { .. }
                | EvalError::EmptyWaveform
                | EvalError::SilentWaveform
                | EvalError::LengthMismatch { .. }
                | EvalError::UnsupportedSampleRate { .. }
                | EvalError::BufferTooShort { .. }
                | EvalError::NoUtterances
                | EvalError::Resample { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            EvalError::FileNotFound { .. } => {
                "Check that every noisy file has a same-named clean reference"
            }
            EvalError::AudioReadError { .. } => "Check that the file is a valid WAV file",
            EvalError::AudioWriteError { .. } => "Check that the output directory is writable",
            EvalError::UnsupportedFormat { .. } => "Convert to PCM or IEEE float WAV",
            EvalError::EmptyWaveform => "Remove empty recordings from the corpus",
            EvalError::SilentWaveform => "Remove silent recordings from the corpus",
            EvalError::LengthMismatch { .. } => {
                "Noisy and clean recordings must have the same number of samples"
            }
            EvalError::UnsupportedSampleRate { .. } => "Resample the corpus to 8000 or 16000 Hz",
            EvalError::BufferTooShort { .. } => "Use longer recordings for this metric",
            EvalError::NoUtterances => "The clean reference appears to contain no speech",
            EvalError::Resample { .. } => "Check the recording's sample rate",
            EvalError::InvalidParameter { .. } => "Adjust the parameter to be within valid range",
            EvalError::UnknownMetric { .. } => "Use one of: rmse, snr, pesq, stoi, si_snr",
            EvalError::ConfigError { .. } => "Check the configuration file syntax",
            EvalError::NoScores => "Check the input directory and the metric failures above",
            _ => "Check the error details and try again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EvalError::FileNotFound {
            path: "clean/a.wav".to_string(),
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert_eq!(EvalError::NoScores.error_code(), "NO_SCORES");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(EvalError::SilentWaveform.is_recoverable());
        assert!(EvalError::LengthMismatch {
            reference: 10,
            degraded: 12
        }
        .is_recoverable());
        assert!(!EvalError::NoScores.is_recoverable());
        assert!(!EvalError::ConfigError {
            details: "bad".to_string()
        }
        .is_recoverable());
        assert!(!EvalError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            .is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = EvalError::BufferTooShort {
            metric: "pesq",
            samples: 100,
            required: 2000,
        };
        let msg = err.to_string();
        assert!(msg.contains("pesq"));
        assert!(msg.contains("2000"));
        assert!(!err.recovery_hint().is_empty());
    }
}
