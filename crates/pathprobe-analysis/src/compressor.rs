//! Reference feed-forward compressor.
//!
//! A deterministic model used to produce captures with a known threshold and
//! ratio, so the curve estimator can be validated end to end without a
//! hardware device in the loop.
//!
//! # Signal Flow
//!
//! ```text
//! Input → RMS Detector → Gain Computer → Attack/Release → × Makeup → Output
//! ```
//!
//! The detector is a one-pole mean-square smoother with a short fixed time
//! constant, so its level reads as the RMS of a steady tone. Attack and
//! release shape how fast the gain reduction follows the computed target.

use serde::{Deserialize, Serialize};

/// Time constant of the mean-square level detector in milliseconds.
pub const RMS_DETECTOR_MS: f64 = 5.0;

/// Settings of the reference compressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Threshold in dB RMS.
    pub threshold_db: f64,
    /// Compression ratio (1.0 = no compression).
    pub ratio: f64,
    /// Makeup gain in dB.
    pub makeup_db: f64,
    /// Soft-knee width in dB, 0 for a hard knee.
    pub knee_db: f64,
    /// Attack time in milliseconds.
    pub attack_ms: f64,
    /// Release time in milliseconds.
    pub release_ms: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -12.0,
            ratio: 4.0,
            makeup_db: 0.0,
            knee_db: 0.0,
            attack_ms: 10.0,
            release_ms: 100.0,
        }
    }
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
fn time_constant_coeff(ms: f64, sample_rate: u32) -> f64 {
    let samples = ms.max(1e-6) / 1000.0 * sample_rate.max(1) as f64;
    (-1.0 / samples).exp()
}

/// Static gain computer.
#[derive(Debug, Clone, Copy)]
struct GainComputer {
    threshold_db: f64,
    ratio: f64,
    knee_db: f64,
}

impl GainComputer {
    /// Gain change in dB (never positive) for a detector level in dB.
    fn gain_db(&self, level_db: f64) -> f64 {
        let slope = 1.0 / self.ratio.max(1e-12) - 1.0;

        if self.knee_db <= 0.0 {
            if level_db <= self.threshold_db {
                return 0.0;
            }
            return (level_db - self.threshold_db) * slope;
        }

        let lower = self.threshold_db - self.knee_db / 2.0;
        let upper = self.threshold_db + self.knee_db / 2.0;
        if level_db < lower {
            0.0
        } else if level_db > upper {
            (level_db - self.threshold_db) * slope
        } else {
            let delta = level_db - lower;
            slope * delta * delta / (2.0 * self.knee_db)
        }
    }
}

/// Sample-by-sample reference compressor.
///
/// # Example
///
/// ```rust
/// use pathprobe_analysis::compressor::{CompressorParams, ReferenceCompressor};
///
/// let mut comp = ReferenceCompressor::new(CompressorParams::default(), 48000);
/// let out = comp.process(0.5);
/// assert!(out.abs() <= 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceCompressor {
    computer: GainComputer,
    makeup: f64,
    detector_coeff: f64,
    attack_coeff: f64,
    release_coeff: f64,
    mean_square: f64,
    /// Current gain reduction in dB (always non-positive).
    gain_reduction_db: f64,
}

impl ReferenceCompressor {
    /// Create a compressor for the given settings and sample rate.
    pub fn new(params: CompressorParams, sample_rate: u32) -> Self {
        Self {
            computer: GainComputer {
                threshold_db: params.threshold_db,
                ratio: params.ratio,
                knee_db: params.knee_db,
            },
            makeup: 10f64.powf(params.makeup_db / 20.0),
            detector_coeff: time_constant_coeff(RMS_DETECTOR_MS, sample_rate),
            attack_coeff: time_constant_coeff(params.attack_ms, sample_rate),
            release_coeff: time_constant_coeff(params.release_ms, sample_rate),
            mean_square: 0.0,
            gain_reduction_db: 0.0,
        }
    }

    /// Current gain reduction in dB.
    pub fn gain_reduction_db(&self) -> f64 {
        self.gain_reduction_db
    }

    /// Clear detector and gain state.
    pub fn reset(&mut self) {
        self.mean_square = 0.0;
        self.gain_reduction_db = 0.0;
    }

    /// Process one sample.
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        self.mean_square = self.detector_coeff * self.mean_square + (1.0 - self.detector_coeff) * x * x;
        let level_db = 10.0 * self.mean_square.max(1e-24).log10();

        let target = self.computer.gain_db(level_db);
        // Attack when more reduction is needed, release otherwise
        let coeff = if target < self.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain_reduction_db = coeff * self.gain_reduction_db + (1.0 - coeff) * target;

        let gain = 10f64.powf(self.gain_reduction_db / 20.0) * self.makeup;
        (x * gain) as f32
    }

    /// Process a whole buffer into a new one.
    pub fn process_buffer(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.process(x)).collect()
    }
}

/// Run `signal` through a freshly reset reference compressor.
pub fn apply_compressor(signal: &[f32], params: &CompressorParams, sample_rate: u32) -> Vec<f32> {
    ReferenceCompressor::new(*params, sample_rate).process_buffer(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::rms_floored;
    use crate::tone::sine;

    #[test]
    fn test_below_threshold_is_transparent() {
        let signal = sine(1000.0, 0.05, 48000, 0.5);
        let out = apply_compressor(signal.samples(), &CompressorParams::default(), 48000);
        for (a, b) in signal.samples().iter().zip(&out) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_steady_state_gain_follows_ratio() {
        // 1.0 peak sine = -3.01 dB RMS, 8.99 dB over a -12 dB threshold
        let params = CompressorParams::default();
        let signal = sine(1000.0, 1.0, 48000, 1.0);
        let out = apply_compressor(signal.samples(), &params, 48000);

        let tail = 24000..48000;
        let in_db = 20.0 * rms_floored(&signal.samples()[tail.clone()]).log10();
        let out_db = 20.0 * rms_floored(&out[tail]).log10();
        let expected = params.threshold_db + (in_db - params.threshold_db) / params.ratio;
        assert!((out_db - expected).abs() < 0.2, "out {out_db} expected {expected}");
    }

    #[test]
    fn test_makeup_gain_applied() {
        let params = CompressorParams {
            makeup_db: 6.0,
            ..CompressorParams::default()
        };
        let signal = sine(1000.0, 0.05, 48000, 0.2);
        let out = apply_compressor(signal.samples(), &params, 48000);
        let ratio = rms_floored(&out) / rms_floored(signal.samples());
        assert!((ratio - 10f64.powf(0.3)).abs() < 1e-3);
    }

    #[test]
    fn test_soft_knee_is_continuous() {
        let computer = GainComputer {
            threshold_db: -20.0,
            ratio: 4.0,
            knee_db: 6.0,
        };
        let lower = computer.gain_db(-23.0);
        let upper = computer.gain_db(-17.0);
        assert!(lower.abs() < 1e-12);
        assert!((upper - 3.0 * (0.25 - 1.0)).abs() < 1e-9);
        // Strictly between the two neighbouring regimes inside the knee
        let mid = computer.gain_db(-20.0);
        assert!(mid < 0.0 && mid > upper);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut comp = ReferenceCompressor::new(CompressorParams::default(), 48000);
        comp.process_buffer(sine(1000.0, 1.0, 48000, 0.1).samples());
        assert!(comp.gain_reduction_db() < -1.0);
        comp.reset();
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }
}
