//! Batch benchmark configuration for pathprobe.
//!
//! A [`BenchPlan`] describes a batch of offline measurements: plan-wide
//! [`BenchDefaults`], estimator tolerances in [`BenchPolicy`], and four lists
//! of cases (THD, attack/release, compressor, compare). Plans load from
//! `.toml` or `.json` files, chosen by extension.
//!
//! # Features
//!
//! - **Defaults**: Flat `fs`/`freq`/`thd_*`/`compressor_*` keys shared by all cases
//! - **Cases**: Per-case overrides resolved against the defaults
//! - **Policy**: Overrides for curve-fit and timing tolerances
//! - **Validation**: Out-of-range settings become [`ConfigError::InvalidValue`]
//!
//! # Example
//!
//! ```rust
//! use pathprobe_config::BenchPlan;
//!
//! let plan = BenchPlan::from_toml(r#"
//!     [defaults]
//!     freq = 997.0
//!
//!     [[thd_cases]]
//!     name = "h2"
//!     harmonic = { order = 2, level_db = -30.0 }
//! "#).unwrap();
//!
//! let params = plan.thd_cases[0].resolve(&plan.defaults).unwrap();
//! assert_eq!(params.freq, 997.0);
//! assert_eq!(params.window, "hann");
//! ```

mod cases;
mod defaults;
mod error;
mod plan;

pub use cases::{
    AttackReleaseCase, AttackReleaseParams, CompareCase, CompareParams, CompressorCase,
    CompressorCaseParams, HarmonicInjection, ThdCase, ThdExpectation, ThdParams, ThdSource,
};
pub use defaults::BenchDefaults;
pub use error::ConfigError;
pub use plan::{BenchPlan, BenchPolicy, ConfigFormat};
