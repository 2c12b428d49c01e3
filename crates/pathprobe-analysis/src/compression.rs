//! Compression-curve estimation from a stepped-amplitude sweep capture.
//!
//! Each sweep level yields one (input dB, output dB) point: the input level is
//! the theoretical RMS of the nominal amplitude, the output level the measured
//! RMS of the trimmed captured segment. A straight line through every point
//! with unit slope and a flat gain difference means the path is linear; when
//! compression is present, a second fit over the compressed points recovers
//! threshold and ratio:
//!
//! ```text
//! out = a'·in + b'      ratio = 1/a'      threshold = b'/(1 − a')
//! ```

use crate::numeric::{EPSILON, linear_fit, mean_square};
use crate::tone::SteppedToneSpec;
use serde::{Deserialize, Serialize};

/// Tolerances used when classifying and fitting a compression curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveFitPolicy {
    /// Maximum |slope − 1| of the all-points fit for a linear path.
    pub slope_tol: f64,
    /// Maximum spread (max − min) of the per-segment gain difference, dB.
    pub spread_tol_db: f64,
    /// Segments whose gain difference is below this are treated as compressed, dB.
    pub compressed_mask_db: f64,
    /// Fewest compressed segments needed to fit threshold and ratio.
    pub min_points: usize,
    /// |1 − slope| at or below this leaves the threshold undefined.
    pub degenerate_slope: f64,
}

impl Default for CurveFitPolicy {
    fn default() -> Self {
        Self {
            slope_tol: 0.05,
            spread_tol_db: 1.0,
            compressed_mask_db: -0.5,
            min_points: 2,
            degenerate_slope: 1e-6,
        }
    }
}

/// Result of [`compression_curve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionCurveResult {
    /// Theoretical input RMS level of each segment, dB.
    pub in_db: Vec<f64>,
    /// Measured output RMS level of each segment, dB.
    pub out_db: Vec<f64>,
    /// `out_db − in_db` per segment.
    pub diff_db: Vec<f64>,
    /// Mean of `diff_db`, reported whether or not compression was found.
    pub gain_offset_db: f64,
    /// True when the path looks linear or too few segments were compressed.
    pub no_compression: bool,
    /// Fitted threshold in dB, `NaN` when undetermined.
    pub thr_db: f64,
    /// Fitted ratio, `1.0` when no compression was detected.
    pub ratio: f64,
}

/// Measured RMS (dB) of the trimmed segment starting at `start`.
fn segment_level_db(capture: &[f32], start: usize, spec: &SteppedToneSpec) -> f64 {
    let begin = start.min(capture.len());
    let end = (start + spec.seg_samples).min(capture.len());
    let segment = &capture[begin..end];

    let lead = spec.trim_lead.min(segment.len());
    let tail_end = segment.len().saturating_sub(spec.trim_tail).max(lead);
    let trimmed = &segment[lead..tail_end];

    let rms = mean_square(trimmed).sqrt().max(EPSILON);
    20.0 * rms.log10()
}

fn spread(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if values.is_empty() { 0.0 } else { max - min }
}

/// Estimate threshold, ratio and gain offset from a captured stepped sweep.
///
/// `spec` must be the spec returned together with the stimulus so segment
/// boundaries line up. Segments that run past the end of the capture are
/// clamped, and an empty segment reads as the 1e-12 floor.
pub fn compression_curve(
    capture: &[f32],
    spec: &SteppedToneSpec,
    policy: &CurveFitPolicy,
) -> CompressionCurveResult {
    let in_db: Vec<f64> = spec
        .amps
        .iter()
        .map(|&amp| sine_rms_db(amp))
        .collect();
    let out_db: Vec<f64> = (0..spec.num_segments())
        .map(|i| segment_level_db(capture, spec.segment_start(i), spec))
        .collect();
    let diff_db: Vec<f64> = out_db.iter().zip(&in_db).map(|(o, i)| o - i).collect();

    let gain_offset_db = if diff_db.is_empty() {
        0.0
    } else {
        diff_db.iter().sum::<f64>() / diff_db.len() as f64
    };

    let slope_all = linear_fit(&in_db, &out_db).map_or(f64::NAN, |(a, _)| a);
    let linear = (slope_all - 1.0).abs() < policy.slope_tol && spread(&diff_db) < policy.spread_tol_db;

    let mut result = CompressionCurveResult {
        in_db,
        out_db,
        diff_db,
        gain_offset_db,
        no_compression: true,
        thr_db: f64::NAN,
        ratio: 1.0,
    };

    if linear {
        tracing::debug!(slope_all, gain_offset_db, "compression_curve: linear path");
        return result;
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = result
        .in_db
        .iter()
        .zip(&result.out_db)
        .zip(&result.diff_db)
        .filter(|&(_, &d)| d < policy.compressed_mask_db)
        .map(|((&x, &y), _)| (x, y))
        .unzip();

    if xs.len() < policy.min_points {
        tracing::warn!(
            compressed_points = xs.len(),
            min_points = policy.min_points,
            "insufficient compression evidence, reporting no compression"
        );
        return result;
    }

    let Some((slope, intercept)) = linear_fit(&xs, &ys) else {
        tracing::warn!("compressed segments share one input level, reporting no compression");
        return result;
    };

    result.no_compression = false;
    result.ratio = 1.0 / slope.max(EPSILON);
    result.thr_db = if (1.0 - slope).abs() > policy.degenerate_slope {
        intercept / (1.0 - slope)
    } else {
        f64::NAN
    };

    tracing::debug!(
        slope,
        intercept,
        thr_db = result.thr_db,
        ratio = result.ratio,
        "compression_curve: fitted"
    );
    result
}

/// Level of a sine of peak `amp` in dB RMS, with the RMS floored at 1e-12.
///
/// This is the nominal input level of each sweep segment.
pub fn sine_rms_db(amp: f64) -> f64 {
    20.0 * (amp / std::f64::consts::SQRT_2).max(EPSILON).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::stepped_sweep;

    #[test]
    fn test_unprocessed_sweep_is_linear() {
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let result = compression_curve(wf.samples(), &spec, &CurveFitPolicy::default());

        assert!(result.no_compression);
        assert!(result.thr_db.is_nan());
        assert_eq!(result.ratio, 1.0);
        assert!(result.gain_offset_db.abs() < 0.1, "offset {}", result.gain_offset_db);
        assert_eq!(result.in_db.len(), 36);
        assert_eq!(result.diff_db.len(), 36);
    }

    #[test]
    fn test_fixed_gain_reports_offset() {
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let scaled: Vec<f32> = wf.samples().iter().map(|x| x * 0.5).collect();
        let result = compression_curve(&scaled, &spec, &CurveFitPolicy::default());

        assert!(result.no_compression);
        assert!((result.gain_offset_db + 6.02).abs() < 0.1);
    }

    #[test]
    fn test_input_levels_are_nominal_sine_rms() {
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let result = compression_curve(wf.samples(), &spec, &CurveFitPolicy::default());
        for (level, &amp) in result.in_db.iter().zip(&spec.amps) {
            assert_eq!(*level, sine_rms_db(amp));
        }
        assert!((sine_rms_db(1.0) + 3.0103).abs() < 1e-4);
        assert!((sine_rms_db(0.0) + 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_static_hard_knee_recovered() {
        // Sample-wise static curve applied per segment level
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let threshold_db = -20.0;
        let ratio = 4.0;
        let mut capture = wf.samples().to_vec();
        for (i, &amp) in spec.amps.iter().enumerate() {
            let level = sine_rms_db(amp);
            let gain_db = if level > threshold_db {
                threshold_db + (level - threshold_db) / ratio - level
            } else {
                0.0
            };
            let g = 10f64.powf(gain_db / 20.0) as f32;
            let start = spec.segment_start(i);
            for x in &mut capture[start..start + spec.seg_samples] {
                *x *= g;
            }
        }

        let result = compression_curve(&capture, &spec, &CurveFitPolicy::default());
        assert!(!result.no_compression);
        assert!((result.thr_db - threshold_db).abs() < 0.5, "thr {}", result.thr_db);
        assert!((result.ratio - ratio).abs() < 0.1, "ratio {}", result.ratio);
    }

    #[test]
    fn test_single_compressed_segment_is_insufficient() {
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let mut capture = wf.samples().to_vec();
        let start = spec.segment_start(35);
        for x in &mut capture[start..start + spec.seg_samples] {
            *x *= 0.5;
        }
        let result = compression_curve(&capture, &spec, &CurveFitPolicy::default());
        assert!(result.no_compression);
        assert!(result.thr_db.is_nan());
        assert_eq!(result.ratio, 1.0);
    }

    #[test]
    fn test_short_capture_is_clamped() {
        let (wf, spec) = stepped_sweep(1000.0, 8000, 1.0);
        let short = &wf.samples()[..wf.len() / 2];
        let result = compression_curve(short, &spec, &CurveFitPolicy::default());
        assert_eq!(result.out_db.len(), 36);
        // Missing segments read as the floor
        assert!((result.out_db[35] + 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_policy_override_changes_classification() {
        let (wf, spec) = stepped_sweep(1000.0, 48000, 1.0);
        let scaled: Vec<f32> = wf.samples().iter().map(|x| x * 0.5).collect();
        let strict = CurveFitPolicy {
            slope_tol: 0.0,
            ..CurveFitPolicy::default()
        };
        // A zero slope tolerance disqualifies the linear shortcut; every
        // segment then sits 6 dB low and the fit sees a unit slope.
        let result = compression_curve(&scaled, &spec, &strict);
        assert!(!result.no_compression);
        assert!((result.ratio - 1.0).abs() < 0.01);
    }
}
