//! Attack/release measurement command.

use super::common::{fmt_ms, read_capture, read_pair, write_json};
use clap::Args;
use pathprobe_analysis::timing::{
    DEFAULT_RMS_WINDOW_MS, TimingPolicy, compare_timing_with_policy, timing_with_policy,
};
use std::path::PathBuf;

#[derive(Args)]
pub struct TimingArgs {
    /// Input (dry) WAV file, or the only file to time
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output (processed) WAV file to compare against INPUT
    #[arg(long, value_name = "OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// RMS envelope window in milliseconds
    #[arg(long, default_value_t = DEFAULT_RMS_WINDOW_MS)]
    rms_win_ms: f64,

    /// Lower crossing level as a fraction of the envelope swing
    #[arg(long, default_value = "0.1")]
    low: f64,

    /// Upper crossing level as a fraction of the envelope swing
    #[arg(long, default_value = "0.9")]
    high: f64,

    /// Output JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: TimingArgs) -> anyhow::Result<()> {
    if !(0.0..1.0).contains(&args.low) || args.high <= args.low || args.high > 1.0 {
        anyhow::bail!(
            "Crossing levels must satisfy 0 <= low < high <= 1 (got {} and {})",
            args.low,
            args.high
        );
    }
    let policy = TimingPolicy {
        low_fraction: args.low,
        high_fraction: args.high,
        ..TimingPolicy::default()
    };

    println!("Attack / Release");
    println!("================");
    println!("  RMS window: {} ms", args.rms_win_ms);

    let report = if let Some(output_file) = &args.output_file {
        let (input, output) = read_pair(&args.input, output_file)?;
        let fs = input.sample_rate();
        let comparison = compare_timing_with_policy(
            input.samples(),
            output.samples(),
            fs,
            args.rms_win_ms,
            &policy,
        );

        println!();
        println!("  {:8}  {:>10}  {:>10}  {:>10}", "", "Input", "Output", "Delta");
        println!(
            "  {:8}  {:>10}  {:>10}  {:>10}",
            "Attack",
            fmt_ms(comparison.input.attack_ms),
            fmt_ms(comparison.output.attack_ms),
            fmt_ms(comparison.delta_attack)
        );
        println!(
            "  {:8}  {:>10}  {:>10}  {:>10}",
            "Release",
            fmt_ms(comparison.input.release_ms),
            fmt_ms(comparison.output.release_ms),
            fmt_ms(comparison.delta_release)
        );
        serde_json::to_value(comparison)?
    } else {
        let capture = read_capture(&args.input)?;
        let result = timing_with_policy(
            capture.samples(),
            capture.sample_rate(),
            args.rms_win_ms,
            &policy,
        );

        println!();
        println!("  Attack:  {}", fmt_ms(result.attack_ms));
        println!("  Release: {}", fmt_ms(result.release_ms));
        serde_json::to_value(result)?
    };

    if let Some(output_path) = &args.output {
        write_json(output_path, &report)?;
        println!("\nWrote report to {}", output_path.display());
    }

    Ok(())
}
