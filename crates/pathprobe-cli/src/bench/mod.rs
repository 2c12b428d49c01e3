//! Batch bench execution and result reporting.

pub mod report;
pub mod runner;

pub use report::{BenchReport, to_csv};
pub use runner::BenchRunner;
