//! Reference/target comparison command.

use super::common::{fmt_db, read_pair, write_json};
use clap::Args;
use pathprobe_analysis::align::{AlignOptions, DEFAULT_STABLE_REGION, align_signals, gain_match};
use pathprobe_analysis::residual::{ResidualOptions, residual_metrics};
use pathprobe_io::{WavSpec, write_wav};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Args)]
pub struct CompareArgs {
    /// Reference audio file (e.g., the transmitted stimulus or dry capture)
    #[arg(value_name = "REFERENCE")]
    reference: PathBuf,

    /// Target audio file (e.g., the capture through the device)
    #[arg(value_name = "TARGET")]
    target: PathBuf,

    /// Fundamental frequency in Hz
    #[arg(long, default_value = "1000.0")]
    freq: f64,

    /// Highest harmonic order for the THD comparison
    #[arg(long, default_value = "5")]
    hmax: usize,

    /// Restrict the correlation lag search to +/- this many samples
    #[arg(long)]
    max_lag: Option<usize>,

    /// Always use the correlation lag, even when onsets disagree
    #[arg(long)]
    no_onset: bool,

    /// Write the residual (target minus reference) to a WAV file
    #[arg(long)]
    residual_out: Option<PathBuf>,

    /// Output JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: CompareArgs) -> anyhow::Result<()> {
    println!("Signal Path Comparison");
    println!("======================");
    println!("  Reference: {}", args.reference.display());
    println!("  Target:    {}", args.target.display());
    println!();

    let (reference, target) = read_pair(&args.reference, &args.target)?;
    let fs = reference.sample_rate();

    let aligned = align_signals(
        reference.samples(),
        target.samples(),
        &AlignOptions {
            max_lag: args.max_lag,
            prefer_onset: !args.no_onset,
        },
    );
    if aligned.reference.is_empty() {
        anyhow::bail!("Recordings do not overlap at lag {}", aligned.lag);
    }
    let matched = gain_match(&aligned.reference, &aligned.target, DEFAULT_STABLE_REGION);
    let metrics = residual_metrics(
        &aligned.reference,
        &matched.target,
        fs,
        args.freq,
        &ResidualOptions {
            max_harmonic: args.hmax,
            include_residual: args.residual_out.is_some(),
            ..ResidualOptions::default()
        },
    );
    let latency_ms = aligned.latency_ms(fs);

    println!(
        "Aligned {} samples ({:.2}s at {} Hz)",
        aligned.reference.len(),
        aligned.reference.len() as f64 / fs as f64,
        fs
    );
    println!();
    println!("  Latency:       {} samples ({latency_ms:.2} ms)", aligned.lag);
    println!("  Gain error:    {:+.2} dB", matched.gain_error_db);
    println!("  SNR:           {}", fmt_db(metrics.snr_db));
    println!("  Noise floor:   {} FS", fmt_db(metrics.noise_floor_dbfs));
    println!(
        "  THD ref/tgt:   {} / {} (delta {})",
        fmt_db(metrics.thd_ref_db),
        fmt_db(metrics.thd_tgt_db),
        fmt_db(metrics.thd_delta_db)
    );
    println!(
        "  FR deviation:  median {}, max {}",
        fmt_db(metrics.fr_dev_median_db),
        fmt_db(metrics.fr_dev_max_db)
    );
    println!("  Clipping:      {} samples", metrics.clipping_samples);
    println!("  Hum:");
    for peak in &metrics.hum_peaks {
        println!("    {:>6.0} Hz  {}", peak.freq, fmt_db(peak.level_db));
    }

    if let (Some(path), Some(residual)) = (&args.residual_out, &metrics.residual) {
        super::common::ensure_parent_dir(path)?;
        write_wav(path, residual, WavSpec::mono_float(fs))?;
        println!("\nWrote residual to {}", path.display());
    }

    if let Some(output_path) = &args.output {
        let mut record = match serde_json::to_value(&metrics)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        record.remove("residual");
        record.insert("latency_samples".to_string(), Value::from(aligned.lag));
        record.insert("latency_ms".to_string(), Value::from(latency_ms));
        record.insert(
            "gain_error_db".to_string(),
            Value::from(matched.gain_error_db),
        );
        write_json(output_path, &record)?;
        println!("\nWrote report to {}", output_path.display());
    }

    Ok(())
}
