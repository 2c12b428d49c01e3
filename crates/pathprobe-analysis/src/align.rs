//! Temporal alignment and gain matching of a reference/target pair.
//!
//! The lag estimate combines two cues: the cross-correlation peak of smoothed
//! absolute-value envelopes, and the difference between the first samples
//! that rise above 10 % of each signal's peak. Onsets resolve the periodic
//! ambiguity of correlating steady tones; the correlation covers signals
//! whose onsets coincide.

use crate::error::AnalysisError;
use crate::numeric::{EPSILON, amplitude_to_db, mean_square, moving_average};
use crate::xcorr::xcorr_full;

/// Width of the envelope smoothing kernel in samples.
pub const ENVELOPE_SMOOTHING: usize = 256;
/// Onset threshold as a fraction of the signal peak.
pub const ONSET_FRACTION: f32 = 0.1;
/// Default index-fraction region used for gain matching and residual metrics.
pub const DEFAULT_STABLE_REGION: (f64, f64) = (0.05, 0.95);

/// Options for [`align_signals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignOptions {
    /// Restrict the correlation search to `|lag| ≤ max_lag`.
    pub max_lag: Option<usize>,
    /// Use the onset lag whenever it is non-zero.
    pub prefer_onset: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            max_lag: None,
            prefer_onset: true,
        }
    }
}

/// Aligned, equal-length slices of reference and target plus the lag used.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Reference samples overlapping the target.
    pub reference: Vec<f32>,
    /// Target samples overlapping the reference.
    pub target: Vec<f32>,
    /// Samples by which the target lags the reference (negative: leads).
    pub lag: isize,
}

impl Alignment {
    /// Lag converted to milliseconds.
    pub fn latency_ms(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.lag as f64 / sample_rate as f64 * 1000.0
    }
}

/// Reject a pair whose sample rates differ.
pub fn check_sample_rates(reference: u32, target: u32) -> Result<(), AnalysisError> {
    if reference == target {
        Ok(())
    } else {
        Err(AnalysisError::SampleRateMismatch { reference, target })
    }
}

/// |x| smoothed by a 'same'-aligned uniform kernel of up to 256 samples.
fn smoothed_envelope(signal: &[f32]) -> Vec<f32> {
    let magnitude: Vec<f32> = signal.iter().map(|x| x.abs()).collect();
    let width = ENVELOPE_SMOOTHING.min(magnitude.len());
    moving_average(&magnitude, width)
}

/// First index where `|x|` exceeds 10 % of the signal peak, 0 if none does.
pub fn onset_index(signal: &[f32]) -> usize {
    let peak = signal.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    let threshold = ONSET_FRACTION * (peak + EPSILON as f32);
    signal.iter().position(|x| x.abs() > threshold).unwrap_or(0)
}

fn slice_from(signal: &[f32], start: usize, len: usize) -> &[f32] {
    let start = start.min(signal.len());
    let end = start.saturating_add(len).min(signal.len());
    &signal[start..end]
}

/// Estimate the lag of `target` relative to `reference` and return the overlapping parts.
pub fn align_signals(reference: &[f32], target: &[f32], options: &AlignOptions) -> Alignment {
    let ref_env = smoothed_envelope(reference);
    let tgt_env = smoothed_envelope(target);
    let corr_lag = xcorr_full(&ref_env, &tgt_env).peak_lag(options.max_lag);

    let ref_onset = onset_index(reference);
    let tgt_onset = onset_index(target);
    let onset_lag = tgt_onset as isize - ref_onset as isize;

    let lag = if options.prefer_onset && onset_lag != 0 {
        onset_lag
    } else {
        corr_lag
    };

    let (ref_part, tgt_part) = if lag >= 0 {
        let shift = lag as usize;
        let ref_part = &reference[..reference.len().saturating_sub(shift)];
        (ref_part, slice_from(target, shift, ref_part.len()))
    } else {
        let shift = lag.unsigned_abs();
        let ref_part = slice_from(reference, shift, target.len());
        (ref_part, &target[..ref_part.len().min(target.len())])
    };
    let len = ref_part.len().min(tgt_part.len());

    tracing::debug!(corr_lag, onset_lag, lag, len, "align_signals");

    Alignment {
        reference: ref_part[..len].to_vec(),
        target: tgt_part[..len].to_vec(),
        lag,
    }
}

/// Index range `[⌊n·start⌋, ⌊n·end⌋)`, or the whole buffer when that range is empty.
pub fn stable_range(len: usize, region: (f64, f64)) -> std::ops::Range<usize> {
    let start = ((len as f64 * region.0) as usize).min(len);
    let end = ((len as f64 * region.1) as usize).min(len);
    if end <= start { 0..len } else { start..end }
}

/// Target scaled to the reference RMS, with the gain error it had before scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMatch {
    /// Target multiplied by `rms_ref / rms_tgt`.
    pub target: Vec<f32>,
    /// `20·log10(rms_tgt / rms_ref + ε)`.
    pub gain_error_db: f64,
}

/// Scale `target` so its RMS over the stable region matches `reference`.
///
/// RMS uses `sqrt(mean(x²) + 1e-12)` so silent buffers never divide by zero.
pub fn gain_match(reference: &[f32], target: &[f32], stable_region: (f64, f64)) -> GainMatch {
    let n = reference.len().min(target.len());
    let range = stable_range(n, stable_region);

    let rms_ref = (mean_square(&reference[range.clone()]) + EPSILON).sqrt();
    let rms_tgt = (mean_square(&target[range]) + EPSILON).sqrt();
    let gain = rms_ref / rms_tgt.max(EPSILON);

    GainMatch {
        target: target.iter().map(|&x| (x as f64 * gain) as f32).collect(),
        gain_error_db: amplitude_to_db(rms_tgt / rms_ref),
    }
}
