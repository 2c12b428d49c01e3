//! Harmonic distortion analysis (THD, THD+N, per-harmonic levels).
//!
//! The fundamental and each harmonic are measured as the summed power of a
//! small band of FFT bins around the bin nearest the nominal frequency, which
//! keeps the estimate stable when the tone falls between bins or the window
//! spreads its energy over the main lobe.
//!
//! ```text
//! THD   = sqrt( Σ_h P(h·f0) / P(f0) )
//! THD+N = sqrt( (P_total − P(f0)) / P(f0) )
//! ```
//!
//! # Example
//!
//! ```rust
//! use pathprobe_analysis::harmonic::{ThdOptions, compute_thd};
//! use pathprobe_analysis::tone::sine_with_harmonic;
//!
//! let signal = sine_with_harmonic(1000.0, 48000, 1.0, 0.5, 3, -40.0);
//! let result = compute_thd(signal.samples(), 48000, 1000.0, &ThdOptions::default());
//! assert!((result.thd_db + 40.0).abs() < 0.5);
//! ```

use crate::error::AnalysisError;
use crate::fft::{RealFft, Window, magnitude_db, nearest_bin, rfft_frequencies};
use crate::numeric::{amplitude_to_db, mean};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Power floor added to the fundamental band so ratios never divide by zero.
const FUNDAMENTAL_POWER_FLOOR: f64 = 1e-24;

/// Options for [`compute_thd`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThdOptions {
    /// Highest harmonic order included (2..=max_harmonic).
    pub max_harmonic: usize,
    /// Window applied before the FFT.
    pub window: Window,
    /// FFT length override; the signal is zero-padded (or truncated) to it.
    pub nfft: Option<usize>,
    /// Half-width, in bins, of the band summed around each harmonic. Floored at 1.
    pub band_bins: usize,
}

impl Default for ThdOptions {
    fn default() -> Self {
        Self {
            max_harmonic: 5,
            window: Window::Hann,
            nfft: None,
            band_bins: 2,
        }
    }
}

impl ThdOptions {
    /// Set the maximum harmonic order.
    pub fn with_max_harmonic(mut self, max_harmonic: usize) -> Self {
        self.max_harmonic = max_harmonic;
        self
    }

    /// Set the window function.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Set the window from its configuration name (`"hann"`, `"hanning"`, `"none"`).
    pub fn with_window_name(self, name: &str) -> Result<Self, AnalysisError> {
        Ok(self.with_window(name.parse()?))
    }

    /// Set the FFT length override.
    pub fn with_nfft(mut self, nfft: Option<usize>) -> Self {
        self.nfft = nfft;
        self
    }

    /// Set the band half-width in bins.
    pub fn with_band_bins(mut self, band_bins: usize) -> Self {
        self.band_bins = band_bins;
        self
    }
}

/// Result of [`compute_thd`].
#[derive(Debug, Clone, Serialize)]
pub struct HarmonicResult {
    /// Linear magnitude of the fundamental band.
    pub fundamental_mag: f64,
    /// Level of each harmonic (order 2..) relative to the fundamental, in dBc.
    pub harmonics_dbc: BTreeMap<u32, f64>,
    /// THD in percent.
    pub thd_percent: f64,
    /// THD as an amplitude ratio (always ≥ 0).
    pub thd_ratio: f64,
    /// THD in dB.
    pub thd_db: f64,
    /// THD+N as an amplitude ratio.
    pub thdn_ratio: f64,
    /// THD+N in dB.
    pub thdn_db: f64,
    /// Frequency of each spectrum bin in Hz (display only, not serialized).
    #[serde(skip)]
    pub freqs: Vec<f32>,
    /// Magnitude spectrum in dB (display only, not serialized).
    #[serde(skip)]
    pub spectrum: Vec<f32>,
    /// Sample rate of the analyzed signal.
    pub fs: u32,
    /// Nominal fundamental frequency in Hz.
    pub fund_freq: f64,
    /// FFT length used.
    pub nfft: usize,
    /// Window used.
    pub window: Window,
    /// Band half-width actually used, in bins.
    pub fund_band_bins: usize,
}

impl HarmonicResult {
    /// Flatten into a JSON record keyed by the stable result field names.
    pub fn to_record(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn band_power(power: &[f64], center: usize, band: usize) -> f64 {
    let start = center.saturating_sub(band).max(1);
    let stop = (center + band + 1).min(power.len());
    if start >= stop {
        return 0.0;
    }
    power[start..stop].iter().sum()
}

/// Measure THD, THD+N and per-harmonic levels of a mono signal.
///
/// The DC mean is removed and the DC bin is zeroed before any band is
/// summed. Calling this twice with the same inputs yields identical results.
pub fn compute_thd(
    signal: &[f32],
    sample_rate: u32,
    freq: f64,
    options: &ThdOptions,
) -> HarmonicResult {
    let dc = mean(signal);
    let mut windowed: Vec<f32> = signal.iter().map(|&x| (x as f64 - dc) as f32).collect();
    options.window.apply(&mut windowed);

    let nfft = options.nfft.filter(|&n| n > 0).unwrap_or(signal.len());
    let magnitudes = if nfft == 0 {
        Vec::new()
    } else {
        RealFft::new(nfft).magnitudes(&windowed)
    };
    let freqs = rfft_frequencies(nfft, sample_rate);

    let mut power: Vec<f64> = magnitudes.iter().map(|&m| (m as f64) * (m as f64)).collect();
    if let Some(dc_bin) = power.first_mut() {
        *dc_bin = 0.0;
    }

    let band = options.band_bins.max(1);
    let fund_idx = nearest_bin(&freqs, freq);
    let fund_power = band_power(&power, fund_idx, band) + FUNDAMENTAL_POWER_FLOOR;
    let fund_mag = fund_power.sqrt();

    let mut harmonics_dbc = BTreeMap::new();
    let mut harmonic_power = 0.0;
    for h in 2..=options.max_harmonic {
        let idx = nearest_bin(&freqs, h as f64 * freq);
        let h_power = band_power(&power, idx, band);
        harmonic_power += h_power;
        harmonics_dbc.insert(h as u32, amplitude_to_db((h_power / fund_power).sqrt()));
    }

    let thd_ratio = (harmonic_power / fund_power).sqrt();
    let total_power: f64 = power.iter().sum();
    let noise_power = (total_power - fund_power).max(0.0);
    let thdn_ratio = (noise_power / fund_power).sqrt();

    let result = HarmonicResult {
        fundamental_mag: fund_mag,
        harmonics_dbc,
        thd_percent: thd_ratio * 100.0,
        thd_ratio,
        thd_db: amplitude_to_db(thd_ratio),
        thdn_ratio,
        thdn_db: amplitude_to_db(thdn_ratio),
        freqs,
        spectrum: magnitude_db(&magnitudes),
        fs: sample_rate,
        fund_freq: freq,
        nfft,
        window: options.window,
        fund_band_bins: band,
    };

    tracing::debug!(
        fund_idx,
        fund_mag,
        thd_db = result.thd_db,
        thdn_db = result.thdn_db,
        "compute_thd"
    );

    result
}

/// Legacy THD key spellings and the canonical key each one maps to.
pub const THD_KEY_ALIASES: &[(&str, &str)] = &[
    ("thdn", "thdn_db"),
    ("thdn_dB", "thdn_db"),
    ("thdn_db", "thdn_db"),
    ("thd+n_db", "thdn_db"),
    ("thd+n", "thdn_db"),
    ("thd_db", "thd_db"),
    ("thd", "thd_db"),
];

/// Canonical keys guaranteed by [`normalize_thd_record`].
pub const THD_CANONICAL_KEYS: [&str; 2] = ["thd_db", "thdn_db"];

fn coerce_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Normalize a THD record so `thd_db` and `thdn_db` are always present and numeric.
///
/// Alias keys fill a canonical key only when it is absent. Values that cannot
/// be read as a finite number are replaced by `fallback_db`; this never fails.
pub fn normalize_thd_record(record: &Map<String, Value>, fallback_db: f64) -> Map<String, Value> {
    let mut normalized = record.clone();
    for &(alias, canonical) in THD_KEY_ALIASES {
        if !normalized.contains_key(canonical)
            && let Some(value) = record.get(alias)
        {
            normalized.insert(canonical.to_string(), value.clone());
        }
    }

    for key in THD_CANONICAL_KEYS {
        let value = normalized
            .get(key)
            .and_then(coerce_f64)
            .unwrap_or(fallback_db);
        normalized.insert(key.to_string(), Value::from(value));
    }
    normalized
}

/// Read `(thd_db, thdn_db)` from a record, accepting legacy aliases.
pub fn thd_levels(record: &Map<String, Value>) -> (f64, f64) {
    let normalized = normalize_thd_record(record, 0.0);
    let read = |key: &str| normalized.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    (read("thd_db"), read("thdn_db"))
}
