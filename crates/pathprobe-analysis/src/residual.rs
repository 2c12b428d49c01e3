//! Residual comparison of an aligned, gain-matched reference/target pair.
//!
//! Metrics are computed on the stable core of both buffers (by default the
//! 5 %–95 % index region) so alignment edges and fades do not leak into them.

use crate::align::{DEFAULT_STABLE_REGION, stable_range};
use crate::fft::{Window, magnitude_db, magnitude_spectrum, nearest_bin, rfft_frequencies};
use crate::harmonic::{ThdOptions, compute_thd};
use crate::numeric::{EPSILON, amplitude_to_db, mean_square, median};
use serde::{Deserialize, Serialize};

/// Mains fundamentals probed for hum.
pub const HUM_FUNDAMENTALS: [f64; 2] = [50.0, 60.0];
/// Multiples of each mains fundamental probed for hum.
pub const HUM_MULTIPLES: usize = 5;
/// Samples at or above this magnitude count as clipped.
pub const CLIP_LEVEL: f32 = 0.999;
/// Band over which the frequency-response deviation is summarized, Hz.
pub const FR_BAND_HZ: (f32, f32) = (20.0, 20_000.0);

/// Level of the target spectrum at one hum frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumPeak {
    /// Probe frequency in Hz.
    pub freq: f64,
    /// Spectrum level at the nearest bin, dB.
    pub level_db: f64,
}

/// Options for [`residual_metrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualOptions {
    /// Highest harmonic order used for the THD comparison.
    pub max_harmonic: usize,
    /// Index-fraction region treated as the stable core.
    pub stable_region: (f64, f64),
    /// Keep the residual buffer in the result.
    pub include_residual: bool,
}

impl Default for ResidualOptions {
    fn default() -> Self {
        Self {
            max_harmonic: 5,
            stable_region: DEFAULT_STABLE_REGION,
            include_residual: false,
        }
    }
}

/// Result of [`residual_metrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualMetrics {
    /// RMS of `target − reference`, dBFS.
    pub residual_rms_dbfs: f64,
    /// Reference RMS over residual RMS, dB.
    pub snr_db: f64,
    /// Same value as `residual_rms_dbfs`.
    pub noise_floor_dbfs: f64,
    /// THD of the reference core, dB.
    pub thd_ref_db: f64,
    /// THD of the target core, dB.
    pub thd_tgt_db: f64,
    /// `thd_tgt_db − thd_ref_db`.
    pub thd_delta_db: f64,
    /// Median per-bin spectrum difference over 20 Hz–20 kHz, dB.
    pub fr_dev_median_db: f64,
    /// Largest absolute per-bin spectrum difference over 20 Hz–20 kHz, dB.
    pub fr_dev_max_db: f64,
    /// Target spectrum level at each hum probe.
    pub hum_peaks: Vec<HumPeak>,
    /// Target core samples with `|x| ≥ 0.999`.
    pub clipping_samples: usize,
    /// `target − reference` over the core, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<Vec<f32>>,
}

fn rms(signal: &[f32]) -> f64 {
    (mean_square(signal) + EPSILON).sqrt()
}

/// Compare two aligned, gain-matched buffers.
///
/// Both are truncated to their common length first. THD on each core uses
/// the default analyzer options apart from `max_harmonic`.
pub fn residual_metrics(
    reference: &[f32],
    target: &[f32],
    sample_rate: u32,
    freq: f64,
    options: &ResidualOptions,
) -> ResidualMetrics {
    let n = reference.len().min(target.len());
    let range = stable_range(n, options.stable_region);
    let ref_core = &reference[range.clone()];
    let tgt_core = &target[range];

    let residual: Vec<f32> = tgt_core.iter().zip(ref_core).map(|(t, r)| t - r).collect();
    let res_rms = rms(&residual);
    let ref_rms = rms(ref_core);
    let residual_rms_dbfs = amplitude_to_db(res_rms);

    let thd_options = ThdOptions::default().with_max_harmonic(options.max_harmonic);
    let thd_ref_db = compute_thd(ref_core, sample_rate, freq, &thd_options).thd_db;
    let thd_tgt_db = compute_thd(tgt_core, sample_rate, freq, &thd_options).thd_db;

    let nfft = ref_core.len();
    let freqs = rfft_frequencies(nfft, sample_rate);
    let ref_db = magnitude_db(&magnitude_spectrum(ref_core, nfft, Window::Hann));
    let tgt_db = magnitude_db(&magnitude_spectrum(tgt_core, nfft, Window::Hann));
    let fr_dev: Vec<f64> = tgt_db
        .iter()
        .zip(&ref_db)
        .map(|(t, r)| (t - r) as f64)
        .collect();

    let in_band: Vec<f64> = freqs
        .iter()
        .zip(&fr_dev)
        .filter(|&(&f, _)| f >= FR_BAND_HZ.0 && f <= FR_BAND_HZ.1)
        .map(|(_, &d)| d)
        .collect();
    let summarized = if in_band.is_empty() { &fr_dev } else { &in_band };
    let fr_dev_median_db = median(summarized);
    let fr_dev_max_db = summarized
        .iter()
        .map(|d| d.abs())
        .fold(f64::NAN, f64::max);

    let hum_peaks = HUM_FUNDAMENTALS
        .iter()
        .flat_map(|&base| (1..=HUM_MULTIPLES).map(move |k| base * k as f64))
        .map(|f| HumPeak {
            freq: f,
            level_db: tgt_db
                .get(nearest_bin(&freqs, f))
                .map_or(f64::NAN, |&db| db as f64),
        })
        .collect();

    let clipping_samples = tgt_core.iter().filter(|x| x.abs() >= CLIP_LEVEL).count();

    let metrics = ResidualMetrics {
        residual_rms_dbfs,
        snr_db: amplitude_to_db(ref_rms / res_rms),
        noise_floor_dbfs: residual_rms_dbfs,
        thd_ref_db,
        thd_tgt_db,
        thd_delta_db: thd_tgt_db - thd_ref_db,
        fr_dev_median_db,
        fr_dev_max_db,
        hum_peaks,
        clipping_samples,
        residual: options.include_residual.then_some(residual),
    };

    tracing::debug!(
        snr_db = metrics.snr_db,
        thd_delta_db = metrics.thd_delta_db,
        clipping_samples,
        "residual_metrics"
    );
    metrics
}
