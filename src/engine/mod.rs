//! Audio Engine Module
//!
//! Core waveform handling:
//! - Waveform type and sample statistics
//! - WAV file I/O

pub mod buffer;
pub mod io;

pub use buffer::{calculate_mean, calculate_peak, dot, linear_to_db, power_to_db, Waveform};
pub use io::{load_waveform, save_waveform};
