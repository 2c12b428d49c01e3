//! Pathprobe Analysis - Measurement engine for captured audio signal paths
//!
//! Feed it a transmitted stimulus and/or the waveform captured at the other
//! end of a device, and it reports how the device behaved:
//!
//! - [`tone`] - Test stimuli: sine, stepped-amplitude sweep, step tone
//! - [`harmonic`] - THD, THD+N and per-harmonic levels
//! - [`compression`] - Compressor threshold/ratio/gain from a stepped sweep
//! - [`compressor`] - Reference compressor model for validating the estimator
//! - [`timing`] - Attack/release from RMS envelope crossings
//! - [`align`] - Lag estimation, slicing and gain matching of two captures
//! - [`residual`] - SNR, frequency-response deviation, hum and clipping
//! - [`xcorr`] - FFT cross-correlation
//! - [`fft`] - Real FFT magnitudes, windows, bin lookup
//! - [`numeric`] - Prefix-sum RMS, medians, least-squares fit
//!
//! Every analyzer is a pure function over complete in-memory buffers: inputs
//! are borrowed read-only and results are freshly allocated, so repeated
//! calls with the same inputs give bit-identical results. Degenerate input
//! produces `NaN` sentinels or flags in the result rather than errors; see
//! [`AnalysisError`] for the few requests that are rejected outright.
//!
//! ## Compression Workflow
//!
//! ```rust
//! use pathprobe_analysis::compression::{CurveFitPolicy, compression_curve};
//! use pathprobe_analysis::compressor::{CompressorParams, apply_compressor};
//! use pathprobe_analysis::tone::stepped_sweep;
//!
//! // 1. Generate the sweep and keep its segmentation
//! let (stimulus, spec) = stepped_sweep(1000.0, 48000, 1.0);
//!
//! // 2. Send it through the device (here: the reference model)
//! let params = CompressorParams { threshold_db: -18.0, ratio: 3.0, ..Default::default() };
//! let capture = apply_compressor(stimulus.samples(), &params, 48000);
//!
//! // 3. Fit the curve with the same segmentation
//! let curve = compression_curve(&capture, &spec, &CurveFitPolicy::default());
//! assert!(!curve.no_compression);
//! assert!((curve.thr_db + 18.0).abs() < 1.0);
//! ```
//!
//! ## Comparing Two Captures
//!
//! ```rust
//! use pathprobe_analysis::align::{AlignOptions, DEFAULT_STABLE_REGION, align_signals, gain_match};
//! use pathprobe_analysis::residual::{ResidualOptions, residual_metrics};
//! use pathprobe_analysis::tone::sine;
//!
//! let reference = sine(1000.0, 0.5, 48000, 1.0).into_samples();
//! let mut target = vec![0.0f32; 96];
//! target.extend(reference.iter().map(|x| x * 0.5));
//!
//! let aligned = align_signals(&reference, &target, &AlignOptions::default());
//! assert_eq!(aligned.lag, 96);
//!
//! let matched = gain_match(&aligned.reference, &aligned.target, DEFAULT_STABLE_REGION);
//! let metrics = residual_metrics(
//!     &aligned.reference,
//!     &matched.target,
//!     48000,
//!     1000.0,
//!     &ResidualOptions::default(),
//! );
//! assert!(metrics.snr_db > 60.0);
//! ```

pub mod align;
pub mod compression;
pub mod compressor;
pub mod error;
pub mod fft;
pub mod harmonic;
pub mod numeric;
pub mod residual;
pub mod timing;
pub mod tone;
pub mod waveform;
pub mod xcorr;

pub use align::{AlignOptions, Alignment, GainMatch, align_signals, gain_match, onset_index};
pub use compression::{CompressionCurveResult, CurveFitPolicy, compression_curve};
pub use compressor::{CompressorParams, ReferenceCompressor, apply_compressor};
pub use error::AnalysisError;
pub use fft::{RealFft, Window};
pub use harmonic::{HarmonicResult, ThdOptions, compute_thd, normalize_thd_record};
pub use residual::{HumPeak, ResidualMetrics, ResidualOptions, residual_metrics};
pub use timing::{
    TimingComparison, TimingPolicy, TimingResult, compare_timing, envelope, timing,
};
pub use tone::{SteppedToneSpec, sine, sine_with_harmonic, step_tone, stepped_sweep};
pub use waveform::Waveform;
