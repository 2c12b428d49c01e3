//! Compression curve estimation command.

use super::common::{fmt_db, read_capture, write_json};
use anyhow::Context;
use clap::Args;
use pathprobe_analysis::compression::{CurveFitPolicy, compression_curve};
use pathprobe_analysis::tone::SteppedToneSpec;
use std::path::PathBuf;

#[derive(Args)]
pub struct CompressorArgs {
    /// Captured stepped sweep (WAV)
    #[arg(value_name = "CAPTURE")]
    capture: PathBuf,

    /// Segmentation JSON written by `generate sweep`
    #[arg(long, value_name = "JSON")]
    spec: PathBuf,

    /// Slope tolerance for the linear-path test
    #[arg(long)]
    slope_tol: Option<f64>,

    /// Gain spread tolerance in dB for the linear-path test
    #[arg(long)]
    spread_tol_db: Option<f64>,

    /// Print the per-step levels
    #[arg(long)]
    detailed: bool,

    /// Output JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: CompressorArgs) -> anyhow::Result<()> {
    let spec_text = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("cannot read '{}'", args.spec.display()))?;
    let spec: SteppedToneSpec = serde_json::from_str(&spec_text)
        .with_context(|| format!("invalid sweep segmentation in '{}'", args.spec.display()))?;
    let capture = read_capture(&args.capture)?;

    if capture.len() < spec.total_samples() {
        tracing::warn!(
            capture = capture.len(),
            expected = spec.total_samples(),
            "capture is shorter than the sweep; trailing steps read as silence"
        );
    }

    let defaults = CurveFitPolicy::default();
    let policy = CurveFitPolicy {
        slope_tol: args.slope_tol.unwrap_or(defaults.slope_tol),
        spread_tol_db: args.spread_tol_db.unwrap_or(defaults.spread_tol_db),
        ..defaults
    };
    let curve = compression_curve(capture.samples(), &spec, &policy);

    println!("Compression Curve");
    println!("=================");
    println!("  Capture: {}", args.capture.display());
    println!("  Steps:   {}", spec.num_segments());
    println!();

    if args.detailed {
        println!("  {:>8}  {:>8}  {:>8}", "In (dB)", "Out (dB)", "Gain");
        println!("  {:>8}  {:>8}  {:>8}", "-------", "--------", "----");
        for ((i, o), d) in curve.in_db.iter().zip(&curve.out_db).zip(&curve.diff_db) {
            println!("  {i:>8.2}  {o:>8.2}  {d:>+8.2}");
        }
        println!();
    }

    if curve.no_compression {
        println!("  No compression detected");
    } else {
        println!("  Threshold: {}", fmt_db(curve.thr_db));
        println!("  Ratio:     {:.2}:1", curve.ratio);
    }
    println!("  Gain offset: {:+.2} dB", curve.gain_offset_db);

    if let Some(output_path) = &args.output {
        write_json(output_path, &curve)?;
        println!("\nWrote report to {}", output_path.display());
    }

    Ok(())
}
