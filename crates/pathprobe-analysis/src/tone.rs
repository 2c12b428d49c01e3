//! Test stimulus synthesis.
//!
//! Pure generators for the three stimuli the analyzers are built around:
//!
//! - [`sine`]: single tone for THD measurement
//! - [`stepped_sweep`]: 36-level amplitude staircase for compression curves
//! - [`step_tone`]: low/high/low envelope exposing one attack and one release
//!
//! None of them fade their edges; see [`Waveform::faded`] for the caller-side
//! click protection applied before playback or export.

use crate::waveform::Waveform;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of amplitude levels in a stepped sweep.
pub const SWEEP_LEVELS: usize = 36;
/// Lowest amplitude of a stepped sweep.
pub const SWEEP_MIN_AMPLITUDE: f64 = 0.05;
/// Default ceiling amplitude of a stepped sweep.
pub const DEFAULT_SWEEP_CEILING: f64 = 1.36;
/// Hold time of each sweep level in seconds.
pub const SEGMENT_SECS: f64 = 0.25;
/// Silent gap after each sweep level in seconds.
pub const GAP_SECS: f64 = 0.05;
/// Samples skipped at the start of each segment before measuring, in seconds.
pub const TRIM_LEAD_SECS: f64 = 0.03;
/// Samples skipped at the end of each segment before measuring, in seconds.
pub const TRIM_TAIL_SECS: f64 = 0.01;

/// Default duration of [`step_tone`] in seconds.
pub const DEFAULT_STEP_TONE_SECS: f64 = 2.0;
/// Relative level of the quiet quarters of [`step_tone`].
pub const STEP_TONE_LOW_LEVEL: f64 = 0.3;

/// Segmentation of a stepped-amplitude sweep.
///
/// The same spec slices the generated stimulus and every capture of it, so
/// segment boundaries line up exactly between transmitted and received audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteppedToneSpec {
    /// Nominal peak amplitude of each segment, in playback order.
    pub amps: Vec<f64>,
    /// Samples per level segment.
    pub seg_samples: usize,
    /// Silent samples after each segment.
    pub gap_samples: usize,
    /// Samples dropped from the start of each segment before measuring.
    pub trim_lead: usize,
    /// Samples dropped from the end of each segment before measuring.
    pub trim_tail: usize,
}

impl SteppedToneSpec {
    /// Standard sweep layout at `sample_rate` with the given amplitudes.
    pub fn new(amps: Vec<f64>, sample_rate: u32) -> Self {
        let fs = sample_rate as f64;
        Self {
            amps,
            seg_samples: (SEGMENT_SECS * fs) as usize,
            gap_samples: (GAP_SECS * fs) as usize,
            trim_lead: (TRIM_LEAD_SECS * fs) as usize,
            trim_tail: (TRIM_TAIL_SECS * fs) as usize,
        }
    }

    /// Number of level segments.
    pub fn num_segments(&self) -> usize {
        self.amps.len()
    }

    /// First sample of segment `index`.
    pub fn segment_start(&self, index: usize) -> usize {
        index * (self.seg_samples + self.gap_samples)
    }

    /// Total stimulus length in samples.
    pub fn total_samples(&self) -> usize {
        self.amps.len() * (self.seg_samples + self.gap_samples)
    }
}

/// Evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

fn tone_samples(freq: f64, amp: f64, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    let fs = sample_rate as f64;
    (0..num_samples)
        .map(|i| (amp * (2.0 * PI * freq * i as f64 / fs).sin()) as f32)
        .collect()
}

/// Single sine tone of `duration` seconds.
pub fn sine(freq: f64, amp: f64, sample_rate: u32, duration: f64) -> Waveform {
    let n = (sample_rate as f64 * duration) as usize;
    Waveform::new(tone_samples(freq, amp, sample_rate, n), sample_rate)
}

/// Sine tone with one injected harmonic `level_db` below (or above) the fundamental.
pub fn sine_with_harmonic(
    freq: f64,
    sample_rate: u32,
    duration: f64,
    amp: f64,
    order: u32,
    level_db: f64,
) -> Waveform {
    let fs = sample_rate as f64;
    let n = (fs * duration) as usize;
    let harmonic_amp = amp * 10f64.powf(level_db / 20.0);
    let harmonic_freq = freq * order as f64;
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let x = amp * (2.0 * PI * freq * t).sin()
                + harmonic_amp * (2.0 * PI * harmonic_freq * t).sin();
            x as f32
        })
        .collect();
    Waveform::new(samples, sample_rate)
}

/// Stepped-amplitude sweep for compression-curve estimation.
///
/// 36 levels spaced linearly from 0.05 to `amp_max`, each held for 0.25 s
/// and followed by 0.05 s of silence. Levels are clamped to `amp_max`.
pub fn stepped_sweep(freq: f64, sample_rate: u32, amp_max: f64) -> (Waveform, SteppedToneSpec) {
    let spec = SteppedToneSpec::new(
        linspace(SWEEP_MIN_AMPLITUDE, amp_max, SWEEP_LEVELS),
        sample_rate,
    );

    let mut samples = Vec::with_capacity(spec.total_samples());
    for &amp in &spec.amps {
        samples.extend(tone_samples(freq, amp.min(amp_max), sample_rate, spec.seg_samples));
        samples.resize(samples.len() + spec.gap_samples, 0.0);
    }

    (Waveform::new(samples, sample_rate), spec)
}

/// Tone whose envelope steps 0.3 → 1.0 → 0.3 across the quarters of `duration`.
///
/// The first quarter is quiet, the middle half loud and the last quarter quiet
/// again, giving one clean rising edge and one clean falling edge.
pub fn step_tone(freq: f64, sample_rate: u32, amp: f64, duration: f64) -> Waveform {
    let n = (sample_rate as f64 * duration) as usize;
    let rise = n / 4;
    let fall = 3 * n / 4;
    let samples = tone_samples(freq, amp, sample_rate, n)
        .into_iter()
        .enumerate()
        .map(|(i, x)| {
            let env = if (rise..fall).contains(&i) {
                1.0
            } else {
                STEP_TONE_LOW_LEVEL
            };
            (x as f64 * env) as f32
        })
        .collect();
    Waveform::new(samples, sample_rate)
}
