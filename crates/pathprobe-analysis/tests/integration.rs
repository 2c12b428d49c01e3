//! Integration tests for pathprobe-analysis.
//!
//! Each section drives one analyzer end to end through the public API with
//! synthetic stimuli whose answer is known in advance.

use pathprobe_analysis::align::{AlignOptions, DEFAULT_STABLE_REGION, align_signals, gain_match};
use pathprobe_analysis::compression::{CurveFitPolicy, compression_curve};
use pathprobe_analysis::compressor::{CompressorParams, apply_compressor};
use pathprobe_analysis::harmonic::{ThdOptions, compute_thd, normalize_thd_record};
use pathprobe_analysis::residual::{ResidualOptions, residual_metrics};
use pathprobe_analysis::timing::{compare_timing, timing};
use pathprobe_analysis::tone::{sine, sine_with_harmonic, step_tone, stepped_sweep};
use pathprobe_analysis::{AnalysisError, Window};

const FS: u32 = 48000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Unit step of `len` samples switching on at `at`.
fn unit_step(len: usize, at: usize) -> Vec<f32> {
    (0..len).map(|i| if i >= at { 1.0 } else { 0.0 }).collect()
}

/// `signal` delayed by `delay` samples at constant length.
///
/// Positive delays shift right and fill with zeros; negative delays shift left
/// and repeat the final sample.
fn delayed(signal: &[f32], delay: isize) -> Vec<f32> {
    let n = signal.len();
    if delay >= 0 {
        let d = delay as usize;
        let mut out = vec![0.0; d];
        out.extend_from_slice(&signal[..n - d]);
        out
    } else {
        let d = delay.unsigned_abs();
        let mut out = signal[d..].to_vec();
        out.resize(n, signal[n - 1]);
        out
    }
}

// ===========================================================================
// 1. Alignment
// ===========================================================================

#[test]
fn step_alignment_recovers_known_delays() {
    let reference = unit_step(4000, 1000);
    for delay in [0isize, 12, -8, 20, 22] {
        let target = delayed(&reference, delay);
        let aligned = align_signals(&reference, &target, &AlignOptions::default());
        assert_eq!(aligned.lag, delay, "delay {delay}");
        assert_eq!(aligned.reference.len(), aligned.target.len());
        assert_eq!(aligned.reference, aligned.target, "delay {delay}");
    }
}

#[test]
fn gain_match_reports_scale_factor() {
    let reference = sine(1000.0, 0.5, FS, 0.5).into_samples();
    for k in [0.25f32, 0.5, 2.0, 3.0] {
        let target: Vec<f32> = reference.iter().map(|x| x * k).collect();
        let matched = gain_match(&reference, &target, DEFAULT_STABLE_REGION);
        let expected_db = 20.0 * (k as f64).log10();
        assert!(
            (matched.gain_error_db - expected_db).abs() < 1e-3,
            "k={k}: {} vs {expected_db}",
            matched.gain_error_db
        );
        for (a, b) in reference.iter().zip(&matched.target) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}

#[test]
fn delayed_attenuated_tone_end_to_end() {
    let reference = step_tone(1000.0, FS, 0.7, 1.0).into_samples();
    let target: Vec<f32> = delayed(&reference, 240).iter().map(|x| x * 0.5).collect();

    let aligned = align_signals(&reference, &target, &AlignOptions::default());
    assert_eq!(aligned.lag, 240);
    assert!((aligned.latency_ms(FS) - 5.0).abs() < 1e-9);

    let matched = gain_match(&aligned.reference, &aligned.target, DEFAULT_STABLE_REGION);
    assert!((matched.gain_error_db + 6.0206).abs() < 0.01);

    let metrics = residual_metrics(
        &aligned.reference,
        &matched.target,
        FS,
        1000.0,
        &ResidualOptions::default(),
    );
    assert!(metrics.snr_db > 60.0, "snr {}", metrics.snr_db);
    assert!(metrics.fr_dev_max_db.is_finite());
}

// ===========================================================================
// 2. Harmonic analysis
// ===========================================================================

#[test]
fn injected_harmonic_levels_recovered() {
    for order in 2..=5 {
        for level_db in [-60.0, -40.0, -25.0, -10.0] {
            let signal = sine_with_harmonic(1000.0, FS, 1.0, 0.5, order, level_db);
            let result = compute_thd(signal.samples(), FS, 1000.0, &ThdOptions::default());
            assert!(
                (result.thd_db - level_db).abs() < 0.5,
                "order {order}, level {level_db}: got {}",
                result.thd_db
            );
            assert!((result.harmonics_dbc[&order] - level_db).abs() < 0.5);
        }
    }
}

#[test]
fn compute_thd_is_deterministic() {
    let signal = sine_with_harmonic(997.0, FS, 0.3, 0.8, 3, -35.0);
    let options = ThdOptions::default().with_nfft(Some(32768));
    let a = compute_thd(signal.samples(), FS, 997.0, &options);
    let b = compute_thd(signal.samples(), FS, 997.0, &options);

    assert_eq!(a.thd_db.to_bits(), b.thd_db.to_bits());
    assert_eq!(a.thdn_db.to_bits(), b.thdn_db.to_bits());
    assert_eq!(a.spectrum, b.spectrum);
    assert_eq!(a.to_record(), b.to_record());
}

#[test]
fn rectangular_window_is_accepted() {
    let signal = sine(1000.0, 0.5, FS, 0.5);
    let options = ThdOptions::default().with_window_name("none").unwrap();
    let result = compute_thd(signal.samples(), FS, 1000.0, &options);
    assert_eq!(result.window, Window::Rectangular);
    // Integer number of cycles: no leakage even without a window
    assert!(result.thd_db < -80.0);
}

#[test]
fn unknown_window_is_rejected() {
    assert!(matches!(
        ThdOptions::default().with_window_name("blackman"),
        Err(AnalysisError::UnsupportedWindow(name)) if name == "blackman"
    ));
}

#[test]
fn thd_record_normalizes_into_canonical_keys() {
    let signal = sine_with_harmonic(1000.0, FS, 0.5, 0.5, 2, -30.0);
    let record = compute_thd(signal.samples(), FS, 1000.0, &ThdOptions::default()).to_record();
    let normalized = normalize_thd_record(&record, 0.0);
    assert_eq!(normalized["thd_db"], record["thd_db"]);
    assert_eq!(normalized["thdn_db"], record["thdn_db"]);
}

// ===========================================================================
// 3. Compression curve
// ===========================================================================

#[test]
fn reference_compressor_parameters_recovered() {
    let (stimulus, spec) = stepped_sweep(1000.0, FS, 1.0);
    for threshold_db in [-24.0, -18.0, -12.0] {
        for ratio in [2.0, 4.0] {
            let params = CompressorParams {
                threshold_db,
                ratio,
                ..CompressorParams::default()
            };
            let capture = apply_compressor(stimulus.samples(), &params, FS);
            let curve = compression_curve(&capture, &spec, &CurveFitPolicy::default());

            assert!(!curve.no_compression, "T={threshold_db} R={ratio}");
            assert!(
                (curve.thr_db - threshold_db).abs() < 1.0,
                "T={threshold_db} R={ratio}: thr {}",
                curve.thr_db
            );
            assert!(
                (curve.ratio - ratio).abs() < 0.2,
                "T={threshold_db} R={ratio}: ratio {}",
                curve.ratio
            );
        }
    }
}

#[test]
fn unprocessed_sweep_reports_no_compression() {
    let (stimulus, spec) = stepped_sweep(1000.0, FS, 1.0);
    let curve = compression_curve(stimulus.samples(), &spec, &CurveFitPolicy::default());
    assert!(curve.no_compression);
    assert!(curve.thr_db.is_nan());
    assert_eq!(curve.ratio, 1.0);
}

#[test]
fn makeup_gain_shows_in_offset_not_ratio() {
    let (stimulus, spec) = stepped_sweep(1000.0, FS, 1.0);
    let params = CompressorParams {
        threshold_db: 0.0,
        ratio: 4.0,
        makeup_db: 6.0,
        ..CompressorParams::default()
    };
    // Threshold above every sweep level: pure makeup gain
    let capture = apply_compressor(stimulus.samples(), &params, FS);
    let curve = compression_curve(&capture, &spec, &CurveFitPolicy::default());
    assert!(curve.no_compression);
    assert!((curve.gain_offset_db - 6.0).abs() < 0.1);
}

// ===========================================================================
// 4. Timing
// ===========================================================================

#[test]
fn step_tone_timing_within_quarter() {
    let duration = 2.0;
    let tone = step_tone(1000.0, FS, 0.7, duration);
    let result = timing(tone.samples(), FS, 5.0);
    let quarter_ms = duration * 1000.0 / 4.0;

    for value in [result.attack_ms, result.release_ms] {
        assert!(value.is_finite() && value > 0.0, "got {value}");
        assert!(value < quarter_ms);
    }
}

#[test]
fn silence_timing_is_nan() {
    let result = timing(&vec![0.0; FS as usize], FS, 5.0);
    assert!(result.attack_ms.is_nan());
    assert!(result.release_ms.is_nan());
}

#[test]
fn compressor_overshoot_shortens_measured_attack() {
    let tone = step_tone(1000.0, FS, 0.7, 2.0);
    let params = CompressorParams {
        threshold_db: -20.0,
        ratio: 4.0,
        attack_ms: 30.0,
        release_ms: 200.0,
        ..CompressorParams::default()
    };
    let processed = apply_compressor(tone.samples(), &params, FS);
    let comparison = compare_timing(tone.samples(), &processed, FS, 5.0);
    let (input, output) = (comparison.input, comparison.output);

    for value in [input.attack_ms, input.release_ms, output.attack_ms, output.release_ms] {
        assert!(value.is_finite(), "{comparison:?}");
    }
    assert_eq!(comparison.delta_attack, output.attack_ms - input.attack_ms);
    assert_eq!(comparison.delta_release, output.release_ms - input.release_ms);

    // The slow gain attack lets the loud edge through before it is pulled
    // down, so the output passes both crossing levels almost at once.
    assert!(
        output.attack_ms + 2.0 < input.attack_ms,
        "{comparison:?}"
    );
}

// ===========================================================================
// 5. Residual
// ===========================================================================

#[test]
fn identical_buffers_hit_snr_ceiling() {
    let x = sine(1000.0, 0.9, FS, 1.0);
    let metrics = residual_metrics(
        x.samples(),
        x.samples(),
        FS,
        1000.0,
        &ResidualOptions::default(),
    );
    assert!(metrics.snr_db > 100.0);
    assert_eq!(metrics.clipping_samples, 0);
    assert_eq!(metrics.hum_peaks.len(), 10);
}

#[test]
fn clipped_target_is_counted_and_raises_thd() {
    let x = sine(1000.0, 0.9, FS, 1.0);
    let clipped: Vec<f32> = sine(1000.0, 1.5, FS, 1.0)
        .samples()
        .iter()
        .map(|v| v.clamp(-1.0, 1.0))
        .collect();
    let metrics = residual_metrics(
        x.samples(),
        &clipped,
        FS,
        1000.0,
        &ResidualOptions::default(),
    );
    assert!(metrics.clipping_samples > 0);
    assert!(metrics.thd_delta_db > 40.0, "delta {}", metrics.thd_delta_db);
}
