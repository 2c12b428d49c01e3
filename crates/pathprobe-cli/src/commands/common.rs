//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use pathprobe_analysis::Waveform;
use pathprobe_analysis::Window;
use pathprobe_analysis::align::check_sample_rates;
use pathprobe_io::read_waveform;
use serde::Serialize;
use std::path::Path;

/// Parse a window name for clap's `value_parser`.
pub fn parse_window(s: &str) -> Result<Window, String> {
    s.parse::<Window>().map_err(|e| e.to_string())
}

/// Read a recording as a mono waveform, naming the file on failure.
pub fn read_capture(path: &Path) -> anyhow::Result<Waveform> {
    read_waveform(path).with_context(|| format!("cannot read WAV '{}'", path.display()))
}

/// Read two recordings that must share a sample rate.
pub fn read_pair(reference: &Path, target: &Path) -> anyhow::Result<(Waveform, Waveform)> {
    let reference = read_capture(reference)?;
    let target = read_capture(target)?;
    if let Err(e) = check_sample_rates(reference.sample_rate(), target.sample_rate()) {
        anyhow::bail!("{e}");
    }
    Ok((reference, target))
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("cannot write '{}'", path.display()))?;
    Ok(())
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Format a level in dB, or `n/a` for the NaN sentinel.
pub fn fmt_db(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.2} dB")
    }
}

/// Format a duration in ms, or `n/a` for the NaN sentinel.
pub fn fmt_ms(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.1} ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("hann"), Ok(Window::Hann));
        assert_eq!(parse_window("none"), Ok(Window::Rectangular));
        assert!(parse_window("kaiser").unwrap_err().contains("kaiser"));
    }

    #[test]
    fn test_nan_formats_as_na() {
        assert_eq!(fmt_db(f64::NAN), "n/a");
        assert_eq!(fmt_db(-3.0), "-3.00 dB");
        assert_eq!(fmt_ms(f64::NAN), "n/a");
        assert_eq!(fmt_ms(12.34), "12.3 ms");
    }
}
