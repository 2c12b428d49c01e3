//! Attack/release timing from RMS envelope level crossings.
//!
//! The input is expected to follow the [`step_tone`](crate::tone::step_tone)
//! layout: quiet first quarter, loud middle half, quiet last quarter. Reference
//! levels are the medians of those three regions, and each duration is the
//! time between the first 10 % and first 90 % crossings of the transition.
//!
//! ```text
//!  level
//!   high ┤        ┌──────────────┐
//!        │        │              │
//!    low ┤────────┘              └────────
//!        └────────┬──────────────┬──────── t
//!                q1             q3
//! ```

use crate::numeric::{median, sliding_rms};
use serde::{Deserialize, Serialize};

/// Default RMS envelope window in milliseconds.
pub const DEFAULT_RMS_WINDOW_MS: f64 = 5.0;

/// Tunables of the crossing search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    /// Fraction of the transition where timing starts.
    pub low_fraction: f64,
    /// Fraction of the transition where timing ends.
    pub high_fraction: f64,
    /// Search windows open this fraction of the length before each transition.
    pub search_lead_in: f64,
    /// Envelopes shorter than this are degenerate.
    pub min_points: usize,
    /// Envelopes whose peak is below this are degenerate.
    pub peak_floor: f64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            low_fraction: 0.1,
            high_fraction: 0.9,
            search_lead_in: 0.1,
            min_points: 10,
            peak_floor: 1e-12,
        }
    }
}

/// Attack and release durations in milliseconds, `NaN` when undetermined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingResult {
    /// Rising 10 %→90 % time.
    pub attack_ms: f64,
    /// Falling 90 %→10 % time.
    pub release_ms: f64,
}

impl TimingResult {
    /// Both durations undetermined.
    pub const NAN: Self = Self {
        attack_ms: f64::NAN,
        release_ms: f64::NAN,
    };
}

/// Timing of an input/output pair and the change the device introduced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingComparison {
    /// Timing of the signal entering the device.
    pub input: TimingResult,
    /// Timing of the signal leaving the device.
    pub output: TimingResult,
    /// `output.attack_ms − input.attack_ms`.
    pub delta_attack: f64,
    /// `output.release_ms − input.release_ms`.
    pub delta_release: f64,
}

/// Half-width in samples of an RMS window of `win_ms`, at least 1.
pub fn window_samples(sample_rate: u32, win_ms: f64) -> usize {
    let win = sample_rate as f64 * win_ms / 1000.0;
    if win.is_finite() && win >= 1.0 {
        win as usize
    } else {
        1
    }
}

/// Centred RMS envelope, same length as `signal`, O(n).
pub fn envelope(signal: &[f32], sample_rate: u32, win_ms: f64) -> Vec<f32> {
    sliding_rms(signal, window_samples(sample_rate, win_ms))
}

#[derive(Clone, Copy)]
enum Direction {
    Rising,
    Falling,
}

fn first_crossing(env: &[f32], level: f64, direction: Direction) -> Option<usize> {
    env.iter().position(|&v| {
        let v = v as f64;
        match direction {
            Direction::Rising => v >= level,
            Direction::Falling => v <= level,
        }
    })
}

/// Duration in ms between the first crossings of `start_level` and `end_level`.
fn transition_ms(
    env: &[f32],
    offset: usize,
    (start_level, end_level): (f64, f64),
    direction: Direction,
    sample_rate: u32,
) -> Option<f64> {
    let start = offset + first_crossing(env, start_level, direction)?;
    let end = offset + first_crossing(env, end_level, direction)?;
    Some((end as f64 - start as f64) / sample_rate as f64 * 1000.0)
}

/// Attack and release of a step-shaped signal with the default policy.
pub fn timing(signal: &[f32], sample_rate: u32, win_ms: f64) -> TimingResult {
    timing_with_policy(signal, sample_rate, win_ms, &TimingPolicy::default())
}

/// Attack and release of a step-shaped signal.
///
/// Returns [`TimingResult::NAN`] for short, non-finite or silent envelopes; a
/// single missing crossing only invalidates its own duration.
pub fn timing_with_policy(
    signal: &[f32],
    sample_rate: u32,
    win_ms: f64,
    policy: &TimingPolicy,
) -> TimingResult {
    let env = envelope(signal, sample_rate, win_ms);
    let n = env.len();
    if n < policy.min_points || sample_rate == 0 {
        tracing::warn!(n, "envelope too short for timing");
        return TimingResult::NAN;
    }

    let peak = env.iter().fold(f32::NEG_INFINITY, |m, &v| m.max(v)) as f64;
    if !peak.is_finite() || env.iter().any(|v| !v.is_finite()) {
        tracing::warn!("non-finite envelope, timing undetermined");
        return TimingResult::NAN;
    }
    if peak < policy.peak_floor {
        tracing::warn!(peak, "silent envelope, timing undetermined");
        return TimingResult::NAN;
    }

    let q1 = n / 4;
    let q3 = 3 * n / 4;
    let as_f64 = |s: &[f32]| s.iter().map(|&v| v as f64).collect::<Vec<_>>();
    let low = median(&as_f64(&env[..q1]));
    let high = median(&as_f64(&env[q1..q3]));
    let tail = median(&as_f64(&env[q3..]));

    let rise_levels = (
        low + policy.low_fraction * (high - low),
        low + policy.high_fraction * (high - low),
    );
    let fall_levels = (
        high - policy.low_fraction * (high - tail),
        high - policy.high_fraction * (high - tail),
    );

    let lead = (n as f64 * policy.search_lead_in) as usize;
    let rise_start = q1.saturating_sub(lead);
    let fall_start = q3.saturating_sub(lead);

    let attack = transition_ms(
        &env[rise_start..q3],
        rise_start,
        rise_levels,
        Direction::Rising,
        sample_rate,
    );
    let release = transition_ms(
        &env[fall_start..],
        fall_start,
        fall_levels,
        Direction::Falling,
        sample_rate,
    );

    tracing::debug!(low, high, tail, ?attack, ?release, "timing crossings");

    TimingResult {
        attack_ms: attack.unwrap_or(f64::NAN),
        release_ms: release.unwrap_or(f64::NAN),
    }
}

/// Time both signals with the default policy and report the output-minus-input deltas.
pub fn compare_timing(
    input: &[f32],
    output: &[f32],
    sample_rate: u32,
    win_ms: f64,
) -> TimingComparison {
    compare_timing_with_policy(input, output, sample_rate, win_ms, &TimingPolicy::default())
}

/// Time both signals and report the output-minus-input deltas.
pub fn compare_timing_with_policy(
    input: &[f32],
    output: &[f32],
    sample_rate: u32,
    win_ms: f64,
    policy: &TimingPolicy,
) -> TimingComparison {
    let input = timing_with_policy(input, sample_rate, win_ms, policy);
    let output = timing_with_policy(output, sample_rate, win_ms, policy);
    TimingComparison {
        input,
        output,
        delta_attack: output.attack_ms - input.attack_ms,
        delta_release: output.release_ms - input.release_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::step_tone;

    #[test]
    fn test_window_samples_floor() {
        assert_eq!(window_samples(48000, 5.0), 240);
        assert_eq!(window_samples(48000, 0.0), 1);
        assert_eq!(window_samples(100, 1.0), 1);
    }

    #[test]
    fn test_envelope_same_length() {
        let tone = step_tone(1000.0, 48000, 0.7, 0.5);
        assert_eq!(envelope(tone.samples(), 48000, 5.0).len(), tone.len());
    }

    #[test]
    fn test_step_tone_timing_is_short_and_positive() {
        let tone = step_tone(1000.0, 48000, 0.7, 2.0);
        let result = timing(tone.samples(), 48000, 5.0);
        assert!(result.attack_ms.is_finite() && result.attack_ms > 0.0);
        assert!(result.release_ms.is_finite() && result.release_ms > 0.0);
        // An ideal step seen through a 10 ms box window takes about 8 ms
        assert!(result.attack_ms < 15.0, "attack {}", result.attack_ms);
        assert!(result.release_ms < 15.0, "release {}", result.release_ms);
    }

    #[test]
    fn test_silence_is_nan() {
        let result = timing(&[0.0; 48000], 48000, 5.0);
        assert!(result.attack_ms.is_nan());
        assert!(result.release_ms.is_nan());
    }

    #[test]
    fn test_too_short_is_nan() {
        let result = timing(&[0.5; 5], 48000, 5.0);
        assert!(result.attack_ms.is_nan());
        assert!(result.release_ms.is_nan());
    }

    #[test]
    fn test_non_finite_is_nan() {
        let mut signal = vec![0.5; 1000];
        signal[10] = f32::NAN;
        let result = timing(&signal, 48000, 1.0);
        assert!(result.attack_ms.is_nan());
    }

    #[test]
    fn test_compare_deltas() {
        let input = step_tone(1000.0, 48000, 0.7, 2.0);
        let comparison = compare_timing(input.samples(), input.samples(), 48000, 5.0);
        assert_eq!(comparison.delta_attack, 0.0);
        assert_eq!(comparison.delta_release, 0.0);
        assert_eq!(comparison.input, comparison.output);
    }

    #[test]
    fn test_wider_window_lengthens_transitions() {
        let tone = step_tone(1000.0, 48000, 0.7, 2.0);
        let narrow = timing(tone.samples(), 48000, 5.0);
        let wide = timing(tone.samples(), 48000, 20.0);
        assert!(wide.attack_ms > narrow.attack_ms);
        assert!(wide.release_ms > narrow.release_ms);
    }
}
