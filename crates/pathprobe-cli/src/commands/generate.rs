//! Test stimulus generation command.

use super::common::{ensure_parent_dir, write_json};
use clap::{Args, Subcommand};
use pathprobe_analysis::Waveform;
use pathprobe_analysis::tone::{
    DEFAULT_STEP_TONE_SECS, DEFAULT_SWEEP_CEILING, sine, sine_with_harmonic, step_tone,
    stepped_sweep,
};
use pathprobe_io::{WavSpec, write_wav, write_wav_stereo_silent_right};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    command: GenerateCommand,
}

/// Output options shared by every stimulus.
#[derive(Args)]
struct OutputOptions {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Sample rate
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Bit depth (16, 24 or 32; 32 writes float)
    #[arg(long, default_value = "32", value_parser = parse_bits)]
    bits: u16,

    /// Write stereo with the signal on the left and silence on the right
    #[arg(long)]
    stereo: bool,

    /// Skip the edge fade applied before export
    #[arg(long)]
    no_fade: bool,
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate a sine tone
    Sine {
        #[command(flatten)]
        out: OutputOptions,

        /// Frequency in Hz
        #[arg(long, default_value = "1000.0")]
        freq: f64,

        /// Peak amplitude
        #[arg(long, default_value = "0.7")]
        amp: f64,

        /// Duration in seconds
        #[arg(long, default_value = "2.0")]
        duration: f64,
    },

    /// Generate a 36-level stepped-amplitude sweep for compressor measurement
    Sweep {
        #[command(flatten)]
        out: OutputOptions,

        /// Carrier frequency in Hz
        #[arg(long, default_value = "1000.0")]
        freq: f64,

        /// Amplitude of the loudest step
        #[arg(long, default_value_t = DEFAULT_SWEEP_CEILING)]
        amp_max: f64,

        /// Where to write the segmentation JSON (defaults to OUTPUT with .json)
        #[arg(long)]
        spec_out: Option<PathBuf>,
    },

    /// Generate a low/high/low step tone for attack and release measurement
    Step {
        #[command(flatten)]
        out: OutputOptions,

        /// Carrier frequency in Hz
        #[arg(long, default_value = "1000.0")]
        freq: f64,

        /// Peak amplitude of the loud half
        #[arg(long, default_value = "0.7")]
        amp: f64,

        /// Duration in seconds
        #[arg(long, default_value_t = DEFAULT_STEP_TONE_SECS)]
        duration: f64,
    },

    /// Generate a sine with one injected harmonic
    Harmonic {
        #[command(flatten)]
        out: OutputOptions,

        /// Fundamental frequency in Hz
        #[arg(long, default_value = "1000.0")]
        freq: f64,

        /// Peak amplitude of the fundamental
        #[arg(long, default_value = "0.7")]
        amp: f64,

        /// Duration in seconds
        #[arg(long, default_value = "2.0")]
        duration: f64,

        /// Harmonic order
        #[arg(long, default_value = "2")]
        order: u32,

        /// Harmonic level relative to the fundamental in dB
        #[arg(long, default_value = "-30.0", allow_negative_numbers = true)]
        level_db: f64,
    },
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    match args.command {
        GenerateCommand::Sine {
            out,
            freq,
            amp,
            duration,
        } => {
            println!("Generating {freq} Hz sine, amplitude {amp}, {duration}s");
            let tone = sine(freq, amp, out.sample_rate, duration);
            export(&out, &tone)
        }

        GenerateCommand::Sweep {
            out,
            freq,
            amp_max,
            spec_out,
        } => {
            let (sweep, spec) = stepped_sweep(freq, out.sample_rate, amp_max);
            println!(
                "Generating stepped sweep: {} levels up to {amp_max} at {freq} Hz ({:.2}s)",
                spec.num_segments(),
                sweep.duration_secs()
            );
            export(&out, &sweep)?;

            let spec_path = spec_out.unwrap_or_else(|| out.output.with_extension("json"));
            write_json(&spec_path, &spec)?;
            println!("Wrote segmentation to {}", spec_path.display());
            Ok(())
        }

        GenerateCommand::Step {
            out,
            freq,
            amp,
            duration,
        } => {
            println!("Generating step tone at {freq} Hz, amplitude {amp}, {duration}s");
            let tone = step_tone(freq, out.sample_rate, amp, duration);
            export(&out, &tone)
        }

        GenerateCommand::Harmonic {
            out,
            freq,
            amp,
            duration,
            order,
            level_db,
        } => {
            println!("Generating {freq} Hz sine with H{order} at {level_db} dBc");
            let tone = sine_with_harmonic(freq, out.sample_rate, duration, amp, order, level_db);
            export(&out, &tone)
        }
    }
}

fn parse_bits(s: &str) -> Result<u16, String> {
    match s {
        "16" => Ok(16),
        "24" => Ok(24),
        "32" => Ok(32),
        other => Err(format!("unsupported bit depth '{other}' (expected 16, 24 or 32)")),
    }
}

fn export(out: &OutputOptions, waveform: &Waveform) -> anyhow::Result<()> {
    let waveform = if out.no_fade {
        waveform.clone()
    } else {
        waveform.faded()
    };
    let spec = WavSpec {
        sample_rate: out.sample_rate,
        bits_per_sample: out.bits,
    };
    write_stimulus(&out.output, waveform.samples(), spec, out.stereo)?;
    println!(
        "Wrote {} samples to {}",
        waveform.len(),
        out.output.display()
    );
    Ok(())
}

fn write_stimulus(path: &Path, samples: &[f32], spec: WavSpec, stereo: bool) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    if stereo {
        write_wav_stereo_silent_right(path, samples, spec)?;
    } else {
        write_wav(path, samples, spec)?;
    }
    Ok(())
}
