//! Sequential execution of a bench plan.
//!
//! Cases run one after another in plan order (THD, attack/release,
//! compressor, compare). The cancellation flag is only checked between
//! cases; an analysis that has started always finishes.

use super::report::{BenchCase, Category};
use indicatif::ProgressBar;
use pathprobe_analysis::align::{
    AlignOptions, DEFAULT_STABLE_REGION, align_signals, check_sample_rates, gain_match,
};
use pathprobe_analysis::compression::compression_curve;
use pathprobe_analysis::compressor::apply_compressor;
use pathprobe_analysis::harmonic::{compute_thd, normalize_thd_record, thd_levels};
use pathprobe_analysis::residual::{ResidualOptions, residual_metrics};
use pathprobe_analysis::timing::timing_with_policy;
use pathprobe_analysis::tone::{sine, sine_with_harmonic, step_tone, stepped_sweep};
use pathprobe_config::{
    AttackReleaseCase, BenchPlan, CompareCase, CompressorCase, ThdCase, ThdSource,
};
use pathprobe_io::read_waveform;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicBool, Ordering};

const SKIP_MISSING_INPUT: &str = "Skipped: missing input_wav.";
const SKIP_UNREADABLE: &str = "Skipped: cannot read WAV.";
const SKIP_MISSING_PAIR: &str = "Skipped: missing input/output wav.";
const SKIP_PAIR_MISMATCH: &str = "Skipped: fs mismatch or read error.";

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn to_params<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn invalid_config(name: &str, category: Category, err: impl std::fmt::Display) -> BenchCase {
    BenchCase::skipped(
        name,
        category,
        Value::Object(Map::new()),
        format!("Skipped: invalid config: {err}"),
    )
}

/// Runs every case of a plan, reporting progress and honoring cancellation.
pub struct BenchRunner<'a> {
    plan: &'a BenchPlan,
    cancel: &'a AtomicBool,
    progress: ProgressBar,
}

impl<'a> BenchRunner<'a> {
    /// Runner over `plan`, stopping between cases once `cancel` is set.
    pub fn new(plan: &'a BenchPlan, cancel: &'a AtomicBool, progress: ProgressBar) -> Self {
        Self {
            plan,
            cancel,
            progress,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn step(&self, case: BenchCase, out: &mut Vec<BenchCase>) {
        tracing::debug!(summary = %case.summary_line(), "case finished");
        self.progress.inc(1);
        out.push(case);
    }

    /// Run all cases. Returns the cases completed before any cancellation.
    pub fn run(&self) -> Vec<BenchCase> {
        let plan = self.plan;
        let mut cases = Vec::with_capacity(plan.num_cases());

        for case in &plan.thd_cases {
            if self.cancelled() {
                return self.stop(cases);
            }
            self.progress.set_message(case.name.clone());
            self.step(run_thd_case(plan, case), &mut cases);
        }
        for case in &plan.attack_release_cases {
            if self.cancelled() {
                return self.stop(cases);
            }
            self.progress.set_message(case.name.clone());
            self.step(run_attack_release_case(plan, case), &mut cases);
        }
        for case in &plan.compressor_cases {
            if self.cancelled() {
                return self.stop(cases);
            }
            self.progress.set_message(case.name.clone());
            self.step(run_compressor_case(plan, case), &mut cases);
        }
        for case in &plan.compare_cases {
            if self.cancelled() {
                return self.stop(cases);
            }
            self.progress.set_message(case.name.clone());
            self.step(run_compare_case(plan, case), &mut cases);
        }

        self.progress.finish_with_message("done");
        cases
    }

    fn stop(&self, cases: Vec<BenchCase>) -> Vec<BenchCase> {
        tracing::warn!(
            completed = cases.len(),
            total = self.plan.num_cases(),
            "bench interrupted"
        );
        self.progress.abandon_with_message("interrupted");
        cases
    }
}

/// Run one THD case.
pub fn run_thd_case(plan: &BenchPlan, case: &ThdCase) -> BenchCase {
    let category = Category::Thd;
    let params = match case.resolve(&plan.defaults) {
        Ok(params) => params,
        Err(e) => return invalid_config(&case.name, category, e),
    };
    let params_value = to_params(&params);
    let options = match params.options() {
        Ok(options) => options,
        Err(e) => return invalid_config(&case.name, category, e),
    };

    let (signal, fs) = match case.source {
        ThdSource::File => {
            let Some(path) = case.input_wav.as_ref().filter(|p| p.is_file()) else {
                return BenchCase::skipped(&case.name, category, params_value, SKIP_MISSING_INPUT);
            };
            match read_waveform(path) {
                Ok(waveform) => {
                    let fs = waveform.sample_rate();
                    (waveform.into_samples(), fs)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read WAV");
                    return BenchCase::skipped(&case.name, category, params_value, SKIP_UNREADABLE);
                }
            }
        }
        ThdSource::Synthetic => {
            let fs = plan.defaults.fs;
            let signal = match case.harmonic {
                Some(h) => sine_with_harmonic(
                    params.freq,
                    fs,
                    params.duration,
                    params.amp,
                    h.order,
                    h.level_db,
                ),
                None => sine(params.freq, params.amp, fs, params.duration),
            };
            (signal.into_samples(), fs)
        }
    };

    tracing::debug!(name = %case.name, fs, freq = params.freq, "running THD case");
    let result = compute_thd(&signal, fs, params.freq, &options);
    let record = normalize_thd_record(&result.to_record(), 0.0);
    let (thd_db, thdn_db) = thd_levels(&record);
    let notes = case
        .expected
        .map(|expected| expected.check(thd_db, thdn_db))
        .unwrap_or_default();

    BenchCase::measured(&case.name, category, params_value, record).with_notes(notes)
}

/// Run one attack/release case on a synthetic step tone.
pub fn run_attack_release_case(plan: &BenchPlan, case: &AttackReleaseCase) -> BenchCase {
    let category = Category::AttackRelease;
    let params = match case.resolve(&plan.defaults) {
        Ok(params) => params,
        Err(e) => return invalid_config(&case.name, category, e),
    };

    let tone = step_tone(params.freq, params.fs, params.amp, params.duration);
    let result = timing_with_policy(tone.samples(), params.fs, params.rms_win_ms, &plan.policy.timing);

    BenchCase::measured(&case.name, category, to_params(&params), to_object(&result))
}

/// Run one compression-curve case on a synthetic stepped sweep.
pub fn run_compressor_case(plan: &BenchPlan, case: &CompressorCase) -> BenchCase {
    let category = Category::Compressor;
    let params = match case.resolve(&plan.defaults) {
        Ok(params) => params,
        Err(e) => return invalid_config(&case.name, category, e),
    };

    let (stimulus, spec) = stepped_sweep(params.freq, params.fs, params.amp_max);
    let capture = if params.applied {
        apply_compressor(stimulus.samples(), &params.model, params.fs)
    } else {
        stimulus.into_samples()
    };
    let curve = compression_curve(&capture, &spec, &plan.policy.curve_fit);

    BenchCase::measured(&case.name, category, to_params(&params), to_object(&curve))
}

/// Run one comparison of two recordings.
pub fn run_compare_case(plan: &BenchPlan, case: &CompareCase) -> BenchCase {
    let category = Category::Compare;
    let params = match case.resolve(&plan.defaults) {
        Ok(params) => params,
        Err(e) => return invalid_config(&case.name, category, e),
    };
    let file_params = json!({
        "input": params.input_wav.to_string_lossy(),
        "output": params.output_wav.to_string_lossy(),
    });

    if !(params.input_wav.is_file() && params.output_wav.is_file()) {
        return BenchCase::skipped(&case.name, category, file_params, SKIP_MISSING_PAIR);
    }

    let pair = read_waveform(&params.input_wav).and_then(|reference| {
        read_waveform(&params.output_wav).map(|target| (reference, target))
    });
    let (reference, target) = match pair {
        Ok((reference, target))
            if check_sample_rates(reference.sample_rate(), target.sample_rate()).is_ok() =>
        {
            (reference, target)
        }
        Ok((reference, target)) => {
            tracing::warn!(
                reference = reference.sample_rate(),
                target = target.sample_rate(),
                "sample rate mismatch"
            );
            return BenchCase::skipped(&case.name, category, file_params, SKIP_PAIR_MISMATCH);
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot read compare pair");
            return BenchCase::skipped(&case.name, category, file_params, SKIP_PAIR_MISMATCH);
        }
    };
    let fs = reference.sample_rate();

    let aligned = align_signals(
        reference.samples(),
        target.samples(),
        &AlignOptions {
            max_lag: params.max_lag_samples,
            ..AlignOptions::default()
        },
    );
    let matched = gain_match(&aligned.reference, &aligned.target, DEFAULT_STABLE_REGION);
    let metrics = residual_metrics(
        &aligned.reference,
        &matched.target,
        fs,
        params.freq,
        &ResidualOptions {
            max_harmonic: params.hmax,
            ..ResidualOptions::default()
        },
    );

    let mut record = to_object(&metrics);
    record.insert("latency_samples".to_string(), Value::from(aligned.lag));
    record.insert("latency_ms".to_string(), Value::from(aligned.latency_ms(fs)));
    record.insert("gain_error_db".to_string(), Value::from(matched.gain_error_db));

    let mut params_value = to_object(&params);
    params_value.insert("fs".to_string(), Value::from(fs));

    BenchCase::measured(&case.name, category, Value::Object(params_value), record)
}
