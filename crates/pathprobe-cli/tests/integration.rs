//! Integration tests for pathprobe-cli.
//!
//! Tests invoke the built binary and check both console output and the
//! files it writes.

use pathprobe_analysis::tone::sine;
use pathprobe_io::{WavSpec, read_wav_info, write_wav};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `pathprobe` binary built by cargo.
fn pathprobe_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pathprobe"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn run(args: &[&str]) -> Output {
    pathprobe_bin()
        .args(args)
        .output()
        .expect("failed to run pathprobe")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn cli_generate_sweep_writes_spec_next_to_wav() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("sweep.wav");

    let output = run(&["generate", "sweep", path_str(&wav), "--amp-max", "1.0"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("36 levels"));

    let spec = read_json(&dir.path().join("sweep.json"));
    assert_eq!(spec["amps"].as_array().unwrap().len(), 36);
    assert_eq!(spec["seg_samples"], 12000);

    let header = read_wav_info(&wav).unwrap();
    assert_eq!(header.channels, 1);
    assert_eq!(header.sample_rate, 48000);
}

#[test]
fn cli_generate_stereo_playback_layout() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");

    let output = run(&[
        "generate", "sine", path_str(&wav), "--stereo", "--bits", "16", "--duration", "0.5",
    ]);
    assert!(output.status.success());

    let header = read_wav_info(&wav).unwrap();
    assert_eq!(header.channels, 2);
    assert_eq!(header.bits_per_sample, 16);
    assert!(!header.float);
    assert_eq!(header.frames, 24000);
}

// ---------------------------------------------------------------------------
// thd / timing / compressor
// ---------------------------------------------------------------------------

#[test]
fn cli_thd_reports_injected_harmonic() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("h3.wav");
    let report = dir.path().join("h3.json");

    let output = run(&[
        "generate", "harmonic", path_str(&wav), "--order", "3", "--level-db", "-40", "--no-fade",
    ]);
    assert!(output.status.success());

    let output = run(&["thd", path_str(&wav), "-o", path_str(&report)]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("THD+N"));

    let record = read_json(&report);
    let thd_db = record["thd_db"].as_f64().unwrap();
    assert!((thd_db + 40.0).abs() < 0.5, "thd {thd_db}");
    assert!(record["harmonics_dbc"]["3"].is_number());
}

#[test]
fn cli_timing_of_step_tone() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("step.wav");
    let report = dir.path().join("timing.json");

    assert!(run(&["generate", "step", path_str(&wav)]).status.success());
    let output = run(&["timing", path_str(&wav), "-o", path_str(&report)]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Attack"));

    let record = read_json(&report);
    let attack = record["attack_ms"].as_f64().unwrap();
    assert!(attack > 0.0 && attack < 500.0, "attack {attack}");
}

#[test]
fn cli_compressor_on_unprocessed_sweep() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("sweep.wav");
    let spec = dir.path().join("sweep.json");

    assert!(
        run(&["generate", "sweep", path_str(&wav), "--amp-max", "1.0"])
            .status
            .success()
    );
    let output = run(&["compressor", path_str(&wav), "--spec", path_str(&spec)]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No compression detected"));
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

#[test]
fn cli_compare_reports_latency_and_gain() {
    let dir = TempDir::new().unwrap();
    let reference = dir.path().join("ref.wav");
    let target = dir.path().join("tgt.wav");
    let report = dir.path().join("cmp.json");

    let tone = sine(1000.0, 0.5, 48000, 1.0).faded().into_samples();
    let mut delayed = vec![0.0f32; 96];
    delayed.extend(tone.iter().map(|x| x * 0.5));
    write_wav(&reference, &tone, WavSpec::mono_float(48000)).unwrap();
    write_wav(&target, &delayed, WavSpec::mono_float(48000)).unwrap();

    let output = run(&[
        "compare",
        path_str(&reference),
        path_str(&target),
        "-o",
        path_str(&report),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Latency"));

    let record = read_json(&report);
    assert_eq!(record["latency_samples"], 96);
    assert!((record["latency_ms"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    assert!((record["gain_error_db"].as_f64().unwrap() + 6.02).abs() < 0.05);
    assert!(record.get("residual").is_none());
}

#[test]
fn cli_compare_rejects_sample_rate_mismatch() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.wav");
    write_wav(&a, &[0.1; 4800], WavSpec::mono_float(48000)).unwrap();
    write_wav(&b, &[0.1; 4410], WavSpec::mono_float(44100)).unwrap();

    let output = run(&["compare", path_str(&a), path_str(&b)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("sample rate mismatch"));
}

// ---------------------------------------------------------------------------
// bench
// ---------------------------------------------------------------------------

#[test]
fn cli_bench_writes_json_and_csv() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bench.json");
    let out = dir.path().join("out/results.json");
    let csv = dir.path().join("out/results.csv");

    std::fs::write(
        &config,
        r#"{
            "defaults": {"duration": 0.5},
            "thd_cases": [
                {"name": "h2", "harmonic": {"order": 2, "level_db": -30.0}},
                {"name": "cap", "type": "file", "input_wav": "/nonexistent/cap.wav"}
            ],
            "attack_release_cases": [{"name": "ar", "duration": 2.0}],
            "compressor_cases": [{"name": "ref", "apply_compressor": true, "threshold_db": -18.0}],
            "compare_cases": [{"name": "cmp"}]
        }"#,
    )
    .unwrap();

    let output = run(&[
        "bench",
        "--quiet",
        "--config",
        path_str(&config),
        "--out",
        path_str(&out),
        "--csv",
        path_str(&csv),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = stdout(&output);
    assert!(text.contains("- h2 [thd] | THD"));
    assert!(text.contains("- cap [thd] | Skipped: missing input_wav."));
    assert!(text.contains("- cmp [compare] | Skipped: missing input/output wav."));

    let report = read_json(&out);
    assert!(report["env"].is_object());
    let cases = report["cases"].as_array().unwrap();
    assert_eq!(cases.len(), 5);
    assert_eq!(cases[3]["category"], "compressor");
    assert_eq!(cases[3]["metrics"]["no_compression"], false);

    let csv_text = std::fs::read_to_string(&csv).unwrap();
    let header = csv_text.lines().next().unwrap();
    assert!(header.starts_with("name,category,"));
    assert!(header.contains("notes"));
    assert!(header.contains("params"));
    assert_eq!(csv_text.lines().count(), 6);
}

#[test]
fn cli_bench_init_writes_loadable_plan() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("plan.toml");

    let output = run(&["bench", "--init", "--config", path_str(&config)]);
    assert!(output.status.success());
    assert!(config.exists());

    // A second init must not clobber the file
    let output = run(&["bench", "--init", "--config", path_str(&config)]);
    assert!(!output.status.success());

    let plan = pathprobe_config::BenchPlan::load(&config).unwrap();
    assert!(!plan.is_empty());
}
