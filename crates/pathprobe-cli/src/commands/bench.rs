//! Batch benchmark command.

use super::common::{ensure_parent_dir, write_json};
use crate::bench::{BenchReport, BenchRunner, to_csv};
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use pathprobe_config::BenchPlan;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Args)]
pub struct BenchArgs {
    /// Bench plan (.toml or .json); a missing file runs an empty plan
    #[arg(long, default_value = "bench.toml")]
    config: PathBuf,

    /// Path of the JSON results document
    #[arg(long, default_value = "out/bench_results.json")]
    out: PathBuf,

    /// Path of the flat CSV results
    #[arg(long, default_value = "out/bench_results.csv")]
    csv: PathBuf,

    /// Write a starter plan to --config and exit
    #[arg(long)]
    init: bool,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

pub fn run(args: BenchArgs) -> anyhow::Result<()> {
    if args.init {
        if args.config.exists() {
            anyhow::bail!(
                "Refusing to overwrite existing config {}",
                args.config.display()
            );
        }
        BenchPlan::example().save(&args.config)?;
        println!("Wrote starter plan to {}", args.config.display());
        return Ok(());
    }

    let plan = BenchPlan::load_or_default(&args.config)?;
    tracing::info!(
        config = %args.config.display(),
        cases = plan.num_cases(),
        "starting bench"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current case...");
        flag.store(true, Ordering::SeqCst);
    })?;

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(plan.num_cases() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb
    };

    let cases = BenchRunner::new(&plan, &cancel, progress).run();

    write_json(&args.out, &BenchReport::new(&cases))?;
    ensure_parent_dir(&args.csv)?;
    std::fs::write(&args.csv, to_csv(&cases))
        .with_context(|| format!("cannot write '{}'", args.csv.display()))?;
    println!(
        "Wrote results to {} and {}",
        args.out.display(),
        args.csv.display()
    );

    for case in &cases {
        println!("{}", case.summary_line());
    }

    if cancel.load(Ordering::SeqCst) {
        anyhow::bail!(
            "Interrupted after {} of {} cases",
            cases.len(),
            plan.num_cases()
        );
    }
    Ok(())
}
