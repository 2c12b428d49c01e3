//! Bench plan file format and operations.

use pathprobe_analysis::compression::CurveFitPolicy;
use pathprobe_analysis::timing::TimingPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cases::{
    AttackReleaseCase, CompareCase, CompressorCase, ThdCase, ThdExpectation,
};
use crate::defaults::BenchDefaults;
use crate::error::ConfigError;

/// Serialization format of a plan file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Tolerance overrides for the estimators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchPolicy {
    /// Compression curve fitting tolerances.
    pub curve_fit: CurveFitPolicy,
    /// Envelope timing thresholds.
    pub timing: TimingPolicy,
}

/// A complete batch of bench cases.
///
/// # TOML Format
///
/// ```toml
/// [defaults]
/// fs = 48000
/// freq = 1000.0
///
/// [policy.curve_fit]
/// slope_tol = 0.05
///
/// [[thd_cases]]
/// name = "h3_-40"
/// harmonic = { order = 3, level_db = -40.0 }
/// expected = { thd_db_min = -41.0 }
///
/// [[compressor_cases]]
/// name = "ref_4to1"
/// apply_compressor = true
/// threshold_db = -18.0
///
/// [[compare_cases]]
/// name = "loopback"
/// input_wav = "captures/in.wav"
/// output_wav = "captures/out.wav"
/// ```
///
/// The JSON form uses the same keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchPlan {
    /// Plan-wide defaults.
    pub defaults: BenchDefaults,
    /// Estimator tolerances.
    pub policy: BenchPolicy,
    /// Harmonic distortion cases.
    pub thd_cases: Vec<ThdCase>,
    /// Attack/release cases.
    pub attack_release_cases: Vec<AttackReleaseCase>,
    /// Compression curve cases.
    pub compressor_cases: Vec<CompressorCase>,
    /// Reference/target comparison cases.
    pub compare_cases: Vec<CompareCase>,
}

impl BenchPlan {
    /// Load and validate a plan from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let plan = match format {
            ConfigFormat::Toml => Self::from_toml(&content)?,
            ConfigFormat::Json => Self::from_json(&content)?,
        };
        tracing::debug!(path = %path.display(), cases = plan.num_cases(), "loaded bench plan");
        Ok(plan)
    }

    /// Load `path` if it exists, otherwise an empty plan with default settings.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "bench config not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a plan from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let plan: Self = toml::from_str(toml_str)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Parse and validate a plan from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let plan: Self = serde_json::from_str(json_str)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Convert the plan to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert the plan to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the plan, choosing the format from the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => self.to_toml()?,
            ConfigFormat::Json => self.to_json()?,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write_file(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Validate the plan-wide defaults.
    ///
    /// Case overrides are checked when each case is resolved, so one bad
    /// case is reported on its own instead of rejecting the whole plan.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()
    }

    /// Total number of cases across all categories.
    pub fn num_cases(&self) -> usize {
        self.thd_cases.len()
            + self.attack_release_cases.len()
            + self.compressor_cases.len()
            + self.compare_cases.len()
    }

    /// Check if the plan has no cases.
    pub fn is_empty(&self) -> bool {
        self.num_cases() == 0
    }

    /// Starter plan covering every synthetic case kind.
    pub fn example() -> Self {
        Self {
            thd_cases: vec![
                ThdCase::synthetic("pure_sine").with_expected(ThdExpectation {
                    thdn_db_max: Some(-80.0),
                    thd_db_min: None,
                }),
                ThdCase::synthetic("h3_-40").with_harmonic(3, -40.0),
            ],
            attack_release_cases: vec![AttackReleaseCase::new("step_tone")],
            compressor_cases: vec![
                CompressorCase::new("bypass"),
                CompressorCase::new("ref_4to1").with_model(-18.0, 4.0),
            ],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::ThdSource;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/bench.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("bench.JSON")).unwrap(),
            ConfigFormat::Json
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("bench.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(ConfigFormat::from_path(Path::new("bench")).is_err());
    }

    #[test]
    fn test_empty_document_is_default_plan() {
        let plan = BenchPlan::from_toml("").unwrap();
        assert_eq!(plan, BenchPlan::default());
        assert!(plan.is_empty());

        let plan = BenchPlan::from_json("{}").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_json_plan_with_every_category() {
        let json = r#"{
            "defaults": {"freq": 500.0, "thd_max_h": 7},
            "thd_cases": [
                {"name": "synth", "harmonic": {"order": 2, "level_db": -20.0}},
                {"name": "cap", "type": "file", "input_wav": "cap.wav"}
            ],
            "attack_release_cases": [{"name": "ar", "rms_win_ms": 10.0}],
            "compressor_cases": [{"name": "c", "apply_compressor": true, "ratio": 8.0}],
            "compare_cases": [{"name": "cmp", "input_wav": "a.wav", "output_wav": "b.wav"}]
        }"#;
        let plan = BenchPlan::from_json(json).unwrap();
        assert_eq!(plan.num_cases(), 5);
        assert_eq!(plan.defaults.freq, 500.0);
        assert_eq!(plan.thd_cases[1].source, ThdSource::File);

        let params = plan.compare_cases[0].resolve(&plan.defaults).unwrap();
        assert_eq!(params.hmax, 7);
        assert_eq!(params.freq, 500.0);
    }

    #[test]
    fn test_policy_section_overrides_tolerances() {
        let toml_str = r#"
            [policy.curve_fit]
            slope_tol = 0.1

            [policy.timing]
            low_fraction = 0.2
        "#;
        let plan = BenchPlan::from_toml(toml_str).unwrap();
        assert_eq!(plan.policy.curve_fit.slope_tol, 0.1);
        assert_eq!(
            plan.policy.curve_fit.spread_tol_db,
            CurveFitPolicy::default().spread_tol_db
        );
        assert_eq!(plan.policy.timing.low_fraction, 0.2);
        assert_eq!(plan.policy.timing.high_fraction, 0.9);
    }

    #[test]
    fn test_invalid_defaults_rejected_on_parse() {
        let err = BenchPlan::from_toml("[defaults]\nfs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "fs"));
    }

    #[test]
    fn test_example_plan_resolves() {
        let plan = BenchPlan::example();
        assert_eq!(plan.num_cases(), 5);
        for case in &plan.thd_cases {
            case.resolve(&plan.defaults).unwrap();
        }
        for case in &plan.compressor_cases {
            case.resolve(&plan.defaults).unwrap();
        }
    }

    #[test]
    fn test_toml_round_trip_of_example() {
        let plan = BenchPlan::example();
        let text = plan.to_toml().unwrap();
        assert_eq!(BenchPlan::from_toml(&text).unwrap(), plan);
    }
}
