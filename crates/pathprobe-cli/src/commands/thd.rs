//! Harmonic distortion measurement command.

use super::common::{fmt_db, parse_window, read_capture, write_json};
use clap::Args;
use pathprobe_analysis::Window;
use pathprobe_analysis::harmonic::{HarmonicResult, ThdOptions, compute_thd};
use serde_json::Value;
use std::path::PathBuf;

/// Leading samples dropped from live captures before analysis, in milliseconds.
const LIVE_TRIM_MS: f64 = 50.0;

#[derive(Args)]
pub struct ThdArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Fundamental frequency in Hz
    #[arg(long, default_value = "1000.0")]
    freq: f64,

    /// Highest harmonic order
    #[arg(long, default_value = "5")]
    max_h: usize,

    /// Window function (hann or none)
    #[arg(long, default_value = "hann", value_parser = parse_window)]
    window: Window,

    /// FFT length (defaults to the signal length)
    #[arg(long)]
    nfft: Option<usize>,

    /// Band half-width in bins around each harmonic
    #[arg(long, default_value = "2")]
    band_bins: usize,

    /// Treat the file as a live capture: drop the first 50 ms and peak-normalize
    #[arg(long)]
    live: bool,

    /// Output JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: ThdArgs) -> anyhow::Result<()> {
    let capture = read_capture(&args.input)?;
    let fs = capture.sample_rate();

    let signal = if args.live {
        prepare_live_capture(capture.samples(), fs)
    } else {
        capture.samples().to_vec()
    };
    if signal.is_empty() {
        anyhow::bail!("Nothing left to analyze after trimming");
    }

    let options = ThdOptions::default()
        .with_max_harmonic(args.max_h)
        .with_window(args.window)
        .with_nfft(args.nfft)
        .with_band_bins(args.band_bins);
    let result = compute_thd(&signal, fs, args.freq, &options);

    print_report(&args, &result, signal.len());

    if let Some(output_path) = &args.output {
        let mut record = result.to_record();
        record.insert(
            "input".to_string(),
            Value::from(args.input.to_string_lossy().into_owned()),
        );
        record.insert("live".to_string(), Value::from(args.live));
        write_json(output_path, &record)?;
        println!("\nWrote report to {}", output_path.display());
    }

    Ok(())
}

/// Drop the leading transient and normalize to unit peak.
fn prepare_live_capture(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let skip = ((LIVE_TRIM_MS / 1000.0) * sample_rate as f64) as usize;
    let trimmed = &samples[skip.min(samples.len())..];
    let peak = trimmed.iter().fold(0.0f32, |m, x| m.max(x.abs())) + 1e-12;
    trimmed.iter().map(|x| x / peak).collect()
}

fn print_report(args: &ThdArgs, result: &HarmonicResult, len: usize) {
    println!("Harmonic Distortion");
    println!("===================");
    println!("  Input:       {}", args.input.display());
    println!(
        "  Samples:     {} at {} Hz (nfft {}, window {})",
        len, result.fs, result.nfft, result.window
    );
    println!("  Fundamental: {:.1} Hz", result.fund_freq);
    println!();

    println!("  {:>8}  {:>10}", "Harmonic", "Level");
    println!("  {:>8}  {:>10}", "--------", "-----");
    for (order, level) in &result.harmonics_dbc {
        println!("  {:>8}  {:>10}", format!("H{order}"), fmt_db(*level));
    }
    println!();

    println!("  THD:   {:.4} %  ({})", result.thd_percent, fmt_db(result.thd_db));
    println!("  THD+N: {}", fmt_db(result.thdn_db));
}
