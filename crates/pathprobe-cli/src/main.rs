//! Pathprobe CLI - Offline measurement of captured audio signal paths.

mod bench;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathprobe")]
#[command(author, version, about = "Signal path measurement toolkit", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate test stimuli
    Generate(commands::generate::GenerateArgs),

    /// Measure THD and THD+N of a recording
    Thd(commands::thd::ThdArgs),

    /// Measure attack and release times
    Timing(commands::timing::TimingArgs),

    /// Estimate compressor threshold and ratio from a captured sweep
    Compressor(commands::compressor::CompressorArgs),

    /// Compare a reference recording against a target recording
    Compare(commands::compare::CompareArgs),

    /// Run a batch of configured bench cases
    Bench(commands::bench::BenchArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Thd(args) => commands::thd::run(args),
        Commands::Timing(args) => commands::timing::run(args),
        Commands::Compressor(args) => commands::compressor::run(args),
        Commands::Compare(args) => commands::compare::run(args),
        Commands::Bench(args) => commands::bench::run(args),
    }
}
