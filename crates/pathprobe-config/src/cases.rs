//! Bench case descriptions and their resolution against plan defaults.
//!
//! Each case only names what it overrides. [`ThdCase::resolve`] and friends
//! merge those overrides with [`BenchDefaults`] into a fully populated
//! parameter record, which is also what the report stores under `params`.

use pathprobe_analysis::compressor::CompressorParams;
use pathprobe_analysis::harmonic::ThdOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::{
    BenchDefaults, check_compressor, check_frequency, check_max_harmonic, check_positive,
    parse_window,
};
use crate::error::ConfigError;

fn default_thd_name() -> String {
    "thd_case".to_string()
}

fn default_attack_release_name() -> String {
    "attack_release".to_string()
}

fn default_compressor_name() -> String {
    "compressor".to_string()
}

fn default_compare_name() -> String {
    "compare".to_string()
}

// ============================================================================
// THD
// ============================================================================

/// Where a THD case gets its signal from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThdSource {
    /// Synthesize a sine, optionally with one injected harmonic.
    #[default]
    Synthetic,
    /// Read a captured WAV file.
    File,
}

/// Harmonic added to a synthetic THD stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicInjection {
    /// Harmonic order (2 = second harmonic).
    #[serde(default = "HarmonicInjection::default_order")]
    pub order: u32,
    /// Level relative to the fundamental in dB.
    #[serde(default = "HarmonicInjection::default_level_db")]
    pub level_db: f64,
}

impl HarmonicInjection {
    fn default_order() -> u32 {
        2
    }

    fn default_level_db() -> f64 {
        -30.0
    }
}

impl Default for HarmonicInjection {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
            level_db: Self::default_level_db(),
        }
    }
}

/// Sanity bounds on a THD result. Violations become notes, not failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThdExpectation {
    /// Upper bound on THD+N in dB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thdn_db_max: Option<f64>,
    /// Lower bound on THD in dB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thd_db_min: Option<f64>,
}

impl ThdExpectation {
    /// Notes for every bound the measured levels violate.
    pub fn check(&self, thd_db: f64, thdn_db: f64) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(max) = self.thdn_db_max
            && thdn_db > max
        {
            notes.push(format!(
                "Sanity: THD+N {thdn_db:.2} dB exceeds expected max {max}"
            ));
        }
        if let Some(min) = self.thd_db_min
            && thd_db < min
        {
            notes.push(format!("Sanity: THD {thd_db:.2} dB below expected min {min}"));
        }
        notes
    }
}

/// One THD measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThdCase {
    /// Case name shown in reports.
    #[serde(default = "default_thd_name")]
    pub name: String,
    /// Signal source.
    #[serde(rename = "type", default)]
    pub source: ThdSource,
    /// Input file for [`ThdSource::File`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_wav: Option<PathBuf>,
    /// Fundamental frequency override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Amplitude override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp: Option<f64>,
    /// Duration override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Highest harmonic order override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<usize>,
    /// Window name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Band half-width override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamental_band_bins: Option<usize>,
    /// FFT length override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfft: Option<usize>,
    /// Harmonic injected into the synthetic stimulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic: Option<HarmonicInjection>,
    /// Sanity bounds on the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<ThdExpectation>,
}

/// Fully resolved THD parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThdParams {
    /// Fundamental frequency in Hz.
    pub freq: f64,
    /// Amplitude of the synthetic stimulus.
    pub amp: f64,
    /// Duration of the synthetic stimulus in seconds.
    pub duration: f64,
    /// Highest harmonic order.
    pub max_h: usize,
    /// Window name.
    pub window: String,
    /// Band half-width in bins.
    pub fundamental_band_bins: usize,
    /// FFT length, or the signal length when absent.
    pub nfft: Option<usize>,
}

impl ThdParams {
    /// Analyzer options for these parameters.
    pub fn options(&self) -> Result<ThdOptions, ConfigError> {
        Ok(ThdOptions::default()
            .with_max_harmonic(self.max_h)
            .with_window(parse_window("window", &self.window)?)
            .with_band_bins(self.fundamental_band_bins)
            .with_nfft(self.nfft))
    }
}

impl ThdCase {
    /// Synthetic case with no overrides.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ThdSource::Synthetic,
            input_wav: None,
            freq: None,
            amp: None,
            duration: None,
            max_h: None,
            window: None,
            fundamental_band_bins: None,
            nfft: None,
            harmonic: None,
            expected: None,
        }
    }

    /// File case reading `path`.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source: ThdSource::File,
            input_wav: Some(path.into()),
            ..Self::synthetic(name)
        }
    }

    /// Inject a harmonic into the synthetic stimulus.
    pub fn with_harmonic(mut self, order: u32, level_db: f64) -> Self {
        self.harmonic = Some(HarmonicInjection { order, level_db });
        self
    }

    /// Attach sanity bounds.
    pub fn with_expected(mut self, expected: ThdExpectation) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Merge overrides with `defaults`.
    pub fn resolve(&self, defaults: &BenchDefaults) -> Result<ThdParams, ConfigError> {
        let params = ThdParams {
            freq: self.freq.unwrap_or(defaults.freq),
            amp: self.amp.unwrap_or(defaults.amp),
            duration: self.duration.unwrap_or(defaults.duration),
            max_h: self.max_h.unwrap_or(defaults.thd_max_h),
            window: self
                .window
                .clone()
                .unwrap_or_else(|| defaults.thd_window.clone()),
            fundamental_band_bins: self
                .fundamental_band_bins
                .unwrap_or(defaults.thd_fund_band_bins),
            nfft: self.nfft.or(defaults.thd_nfft),
        };
        check_positive("freq", params.freq)?;
        check_max_harmonic("max_h", params.max_h)?;
        parse_window("window", &params.window)?;
        if self.source == ThdSource::Synthetic {
            check_frequency("freq", params.freq, defaults.fs)?;
            check_positive("amp", params.amp)?;
            check_positive("duration", params.duration)?;
        }
        Ok(params)
    }
}

// ============================================================================
// Attack / release
// ============================================================================

/// One attack/release measurement on a synthetic step tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackReleaseCase {
    /// Case name shown in reports.
    #[serde(default = "default_attack_release_name")]
    pub name: String,
    /// Carrier frequency override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Amplitude override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp: Option<f64>,
    /// RMS window override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rms_win_ms: Option<f64>,
    /// Duration override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Fully resolved attack/release parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackReleaseParams {
    /// Carrier frequency in Hz.
    pub freq: f64,
    /// Peak amplitude of the loud half.
    pub amp: f64,
    /// RMS window in milliseconds.
    pub rms_win_ms: f64,
    /// Sample rate in Hz.
    pub fs: u32,
    /// Step tone duration in seconds.
    pub duration: f64,
}

impl AttackReleaseCase {
    /// Case with no overrides.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            freq: None,
            amp: None,
            rms_win_ms: None,
            duration: None,
        }
    }

    /// Merge overrides with `defaults`.
    pub fn resolve(&self, defaults: &BenchDefaults) -> Result<AttackReleaseParams, ConfigError> {
        let params = AttackReleaseParams {
            freq: self.freq.unwrap_or(defaults.freq),
            amp: self.amp.unwrap_or(defaults.amp),
            rms_win_ms: self.rms_win_ms.unwrap_or(defaults.attack_rms_win_ms),
            fs: defaults.fs,
            duration: self.duration.unwrap_or(defaults.duration),
        };
        check_frequency("freq", params.freq, params.fs)?;
        check_positive("amp", params.amp)?;
        check_positive("rms_win_ms", params.rms_win_ms)?;
        check_positive("duration", params.duration)?;
        Ok(params)
    }
}

// ============================================================================
// Compressor
// ============================================================================

/// One compression-curve estimation on a stepped sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorCase {
    /// Case name shown in reports.
    #[serde(default = "default_compressor_name")]
    pub name: String,
    /// Carrier frequency override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Sweep ceiling override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp_max: Option<f64>,
    /// Run the sweep through the reference compressor before estimating.
    #[serde(default)]
    pub apply_compressor: bool,
    /// Threshold override in dBFS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_db: Option<f64>,
    /// Ratio override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Makeup gain override in dB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub makeup_db: Option<f64>,
    /// Knee width override in dB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knee_db: Option<f64>,
    /// Attack time override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_ms: Option<f64>,
    /// Release time override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_ms: Option<f64>,
}

/// Fully resolved compressor case parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressorCaseParams {
    /// Carrier frequency in Hz.
    pub freq: f64,
    /// Sweep ceiling amplitude.
    pub amp_max: f64,
    /// Reference compressor model.
    #[serde(flatten)]
    pub model: CompressorParams,
    /// Whether the model was applied to the sweep.
    pub applied: bool,
    /// Sample rate in Hz.
    pub fs: u32,
}

impl CompressorCase {
    /// Case with no overrides that leaves the sweep unprocessed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            freq: None,
            amp_max: None,
            apply_compressor: false,
            threshold_db: None,
            ratio: None,
            makeup_db: None,
            knee_db: None,
            attack_ms: None,
            release_ms: None,
        }
    }

    /// Apply the reference compressor with the given threshold and ratio.
    pub fn with_model(mut self, threshold_db: f64, ratio: f64) -> Self {
        self.apply_compressor = true;
        self.threshold_db = Some(threshold_db);
        self.ratio = Some(ratio);
        self
    }

    /// Merge overrides with `defaults`.
    pub fn resolve(&self, defaults: &BenchDefaults) -> Result<CompressorCaseParams, ConfigError> {
        let base = defaults.compressor_params();
        let model = CompressorParams {
            threshold_db: self.threshold_db.unwrap_or(base.threshold_db),
            ratio: self.ratio.unwrap_or(base.ratio),
            makeup_db: self.makeup_db.unwrap_or(base.makeup_db),
            knee_db: self.knee_db.unwrap_or(base.knee_db),
            attack_ms: self.attack_ms.unwrap_or(base.attack_ms),
            release_ms: self.release_ms.unwrap_or(base.release_ms),
        };
        let params = CompressorCaseParams {
            freq: self.freq.unwrap_or(defaults.freq),
            amp_max: self.amp_max.unwrap_or(defaults.compressor_amp_max),
            model,
            applied: self.apply_compressor,
            fs: defaults.fs,
        };
        check_frequency("freq", params.freq, params.fs)?;
        check_positive("amp_max", params.amp_max)?;
        check_compressor(&params.model)?;
        Ok(params)
    }
}

// ============================================================================
// Compare
// ============================================================================

/// One comparison of a reference capture against a target capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareCase {
    /// Case name shown in reports.
    #[serde(default = "default_compare_name")]
    pub name: String,
    /// Reference (input) recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_wav: Option<PathBuf>,
    /// Target (output) recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_wav: Option<PathBuf>,
    /// Fundamental frequency override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Highest harmonic order override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmax: Option<usize>,
    /// Bound on the correlation lag search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lag_samples: Option<usize>,
}

/// Fully resolved compare parameters, before the files are opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareParams {
    /// Fundamental frequency in Hz.
    pub freq: f64,
    /// Highest harmonic order.
    pub hmax: usize,
    /// Reference recording.
    pub input_wav: PathBuf,
    /// Target recording.
    pub output_wav: PathBuf,
    /// Bound on the correlation lag search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lag_samples: Option<usize>,
}

impl CompareCase {
    /// Case comparing `input` against `output`.
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_wav: Some(input.into()),
            output_wav: Some(output.into()),
            freq: None,
            hmax: None,
            max_lag_samples: None,
        }
    }

    /// Merge overrides with `defaults`.
    ///
    /// A missing path resolves to an empty one so the caller can report the
    /// case as skipped alongside files that do not exist.
    pub fn resolve(&self, defaults: &BenchDefaults) -> Result<CompareParams, ConfigError> {
        let params = CompareParams {
            freq: self.freq.unwrap_or(defaults.freq),
            hmax: self.hmax.unwrap_or(defaults.thd_max_h),
            input_wav: self.input_wav.clone().unwrap_or_default(),
            output_wav: self.output_wav.clone().unwrap_or_default(),
            max_lag_samples: self.max_lag_samples,
        };
        check_positive("freq", params.freq)?;
        check_max_harmonic("hmax", params.hmax)?;
        Ok(params)
    }
}
