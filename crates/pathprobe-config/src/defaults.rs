//! Plan-wide default settings.

use pathprobe_analysis::compressor::CompressorParams;
use pathprobe_analysis::fft::Window;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings every case falls back to when it does not override them.
///
/// Keys are flat and prefixed by the analyzer they feed, so a config file's
/// `[defaults]` table reads like a single list of knobs:
///
/// ```toml
/// [defaults]
/// fs = 48000
/// freq = 1000.0
/// thd_window = "hann"
/// compressor_threshold_db = -18.0
/// ```
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchDefaults {
    /// Sample rate of synthetic stimuli in Hz.
    pub fs: u32,
    /// Fundamental frequency in Hz.
    pub freq: f64,
    /// Peak amplitude of synthetic tones.
    pub amp: f64,
    /// Duration of synthetic tones in seconds.
    pub duration: f64,
    /// Highest harmonic order included in THD.
    pub thd_max_h: usize,
    /// Half-width in bins of the fundamental and harmonic bands.
    pub thd_fund_band_bins: usize,
    /// Analysis window name (`"hann"` or `"none"`).
    pub thd_window: String,
    /// FFT length; the signal length when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thd_nfft: Option<usize>,
    /// RMS window for attack/release envelopes in milliseconds.
    pub attack_rms_win_ms: f64,
    /// Ceiling amplitude of the stepped sweep.
    pub compressor_amp_max: f64,
    /// Reference compressor threshold in dBFS.
    pub compressor_threshold_db: f64,
    /// Reference compressor ratio.
    pub compressor_ratio: f64,
    /// Reference compressor makeup gain in dB.
    pub compressor_makeup_db: f64,
    /// Reference compressor knee width in dB.
    pub compressor_knee_db: f64,
    /// Reference compressor attack time in milliseconds.
    pub compressor_attack_ms: f64,
    /// Reference compressor release time in milliseconds.
    pub compressor_release_ms: f64,
}

impl Default for BenchDefaults {
    fn default() -> Self {
        let model = CompressorParams::default();
        Self {
            fs: 48000,
            freq: 1000.0,
            amp: 0.7,
            duration: 2.0,
            thd_max_h: 5,
            thd_fund_band_bins: 2,
            thd_window: "hann".to_string(),
            thd_nfft: None,
            attack_rms_win_ms: 5.0,
            compressor_amp_max: 1.0,
            compressor_threshold_db: model.threshold_db,
            compressor_ratio: model.ratio,
            compressor_makeup_db: model.makeup_db,
            compressor_knee_db: model.knee_db,
            compressor_attack_ms: model.attack_ms,
            compressor_release_ms: model.release_ms,
        }
    }
}

impl BenchDefaults {
    /// Reference compressor parameters built from the `compressor_*` keys.
    pub fn compressor_params(&self) -> CompressorParams {
        CompressorParams {
            threshold_db: self.compressor_threshold_db,
            ratio: self.compressor_ratio,
            makeup_db: self.compressor_makeup_db,
            knee_db: self.compressor_knee_db,
            attack_ms: self.compressor_attack_ms,
            release_ms: self.compressor_release_ms,
        }
    }

    /// Check every setting against its meaningful range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fs == 0 {
            return Err(ConfigError::invalid_value("fs", "must be positive"));
        }
        check_frequency("freq", self.freq, self.fs)?;
        check_positive("amp", self.amp)?;
        check_positive("duration", self.duration)?;
        check_max_harmonic("thd_max_h", self.thd_max_h)?;
        parse_window("thd_window", &self.thd_window)?;
        check_positive("attack_rms_win_ms", self.attack_rms_win_ms)?;
        check_positive("compressor_amp_max", self.compressor_amp_max)?;
        check_compressor(&self.compressor_params())
    }
}

pub(crate) fn check_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(
            key,
            format!("must be a positive number, got {value}"),
        ))
    }
}

pub(crate) fn check_frequency(key: &str, freq: f64, fs: u32) -> Result<(), ConfigError> {
    check_positive(key, freq)?;
    let nyquist = fs as f64 / 2.0;
    if freq >= nyquist {
        return Err(ConfigError::invalid_value(
            key,
            format!("{freq} Hz is at or above Nyquist ({nyquist} Hz)"),
        ));
    }
    Ok(())
}

pub(crate) fn check_max_harmonic(key: &str, max_h: usize) -> Result<(), ConfigError> {
    if max_h < 2 {
        return Err(ConfigError::invalid_value(
            key,
            format!("must be at least 2, got {max_h}"),
        ));
    }
    Ok(())
}

pub(crate) fn parse_window(key: &str, name: &str) -> Result<Window, ConfigError> {
    name.parse::<Window>()
        .map_err(|e| ConfigError::invalid_value(key, e.to_string()))
}

pub(crate) fn check_compressor(params: &CompressorParams) -> Result<(), ConfigError> {
    if !(params.ratio.is_finite() && params.ratio >= 1.0) {
        return Err(ConfigError::invalid_value(
            "ratio",
            format!("must be at least 1, got {}", params.ratio),
        ));
    }
    for (key, value) in [
        ("knee_db", params.knee_db),
        ("attack_ms", params.attack_ms),
        ("release_ms", params.release_ms),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ConfigError::invalid_value(
                key,
                format!("must be non-negative, got {value}"),
            ));
        }
    }
    if !params.threshold_db.is_finite() || !params.makeup_db.is_finite() {
        return Err(ConfigError::invalid_value(
            "threshold_db",
            "threshold and makeup must be finite",
        ));
    }
    Ok(())
}
