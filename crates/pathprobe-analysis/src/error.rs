//! Error types for analysis entry points.
//!
//! Only structurally invalid requests are errors. Degenerate signals and
//! missing compression evidence resolve to sentinel values in the result
//! records instead.

use thiserror::Error;

/// Errors surfaced by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The requested FFT window name is not recognized.
    #[error("unsupported window '{0}' (expected 'hann' or 'none')")]
    UnsupportedWindow(String),

    /// Two waveforms were compared at different sample rates.
    #[error("sample rate mismatch: reference {reference} Hz vs target {target} Hz")]
    SampleRateMismatch {
        /// Sample rate of the reference waveform.
        reference: u32,
        /// Sample rate of the target waveform.
        target: u32,
    },
}
