//! WAV file I/O for pathprobe.
//!
//! This crate provides:
//!
//! - **WAV reading**: [`read_wav`] and [`read_waveform`], reducing multi-channel
//!   captures to their first channel
//! - **WAV writing**: [`write_wav`] for mono stimuli and
//!   [`write_wav_stereo_silent_right`] for the left-only playback layout
//! - **Metadata**: [`read_wav_info`] for header-only inspection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pathprobe_io::{read_waveform, write_waveform};
//! use pathprobe_analysis::tone::sine;
//!
//! write_waveform("tone.wav", &sine(1000.0, 0.5, 48000, 1.0).faded())?;
//! let capture = read_waveform("capture.wav")?;
//! println!("{} samples at {} Hz", capture.len(), capture.sample_rate());
//! ```

mod wav;

use std::path::PathBuf;

pub use wav::{
    WavHeader, WavSpec, read_wav, read_wav_info, read_waveform, write_wav,
    write_wav_stereo_silent_right, write_waveform,
};

/// Error types for WAV I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The file decoded to zero sample frames.
    #[error("WAV file contains no samples: {}", .0.display())]
    EmptyFile(PathBuf),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for WAV I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
