//! Real-input FFT, analysis windows and frequency-axis helpers.

use crate::error::AnalysisError;
use crate::numeric::EPSILON;
use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Window function types accepted by the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Window {
    /// Rectangular (no windowing), selected with `"none"`
    Rectangular,
    /// Hann window (raised cosine), selected with `"hann"` or `"hanning"`
    #[default]
    Hann,
}

impl Window {
    /// Multiply `buffer` in place by the window taper.
    ///
    /// The Hann taper is the symmetric form (`n - 1` in the denominator), so
    /// the first and last taps are zero. Buffers of one sample or fewer are
    /// left unchanged.
    pub fn apply(&self, buffer: &mut [f32]) {
        if *self == Window::Rectangular || buffer.len() <= 1 {
            return;
        }
        let span = (buffer.len() - 1) as f32;
        for (i, x) in buffer.iter_mut().enumerate() {
            *x *= 0.5 - 0.5 * (2.0 * PI * i as f32 / span).cos();
        }
    }

    /// Canonical configuration name of the window.
    pub fn name(&self) -> &'static str {
        match self {
            Window::Rectangular => "none",
            Window::Hann => "hann",
        }
    }
}

impl FromStr for Window {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hann" | "hanning" => Ok(Window::Hann),
            "none" => Ok(Window::Rectangular),
            other => Err(AnalysisError::UnsupportedWindow(other.to_string())),
        }
    }
}

impl TryFrom<String> for Window {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Window> for String {
    fn from(window: Window) -> Self {
        window.name().to_string()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Real-input forward transform planned for one length.
pub struct RealFft {
    plan: Arc<dyn rustfft::Fft<f32>>,
    len: usize,
}

impl RealFft {
    /// Plan a transform of `len` points. `len` must be non-zero.
    pub fn new(len: usize) -> Self {
        let plan = FftPlanner::new().plan_fft_forward(len);
        Self { plan, len }
    }

    /// Magnitudes of bins 0..=len/2 of `input`, zero-padded or truncated to the length.
    pub fn magnitudes(&self, input: &[f32]) -> Vec<f32> {
        let mut bins: Vec<Complex<f32>> = input
            .iter()
            .take(self.len)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        bins.resize(self.len, Complex::default());
        self.plan.process(&mut bins);
        bins[..=self.len / 2].iter().map(|c| c.norm()).collect()
    }
}

/// Frequency of every bin of a real FFT of length `nfft` (DC to Nyquist).
pub fn rfft_frequencies(nfft: usize, sample_rate: u32) -> Vec<f32> {
    if nfft == 0 {
        return Vec::new();
    }
    let bin_width = sample_rate as f64 / nfft as f64;
    (0..=nfft / 2)
        .map(|k| (k as f64 * bin_width) as f32)
        .collect()
}

/// Index of the frequency-axis entry closest to `target_hz`.
///
/// The lowest index wins when two bins are equally close.
pub fn nearest_bin(frequencies: &[f32], target_hz: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &f) in frequencies.iter().enumerate() {
        let dist = (f as f64 - target_hz).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Windowed magnitude spectrum of `signal` at length `nfft`.
pub fn magnitude_spectrum(signal: &[f32], nfft: usize, window: Window) -> Vec<f32> {
    if nfft == 0 {
        return Vec::new();
    }
    let mut tapered = signal.to_vec();
    window.apply(&mut tapered);
    RealFft::new(nfft).magnitudes(&tapered)
}

/// Convert linear magnitudes to dB with the additive epsilon floor.
pub fn magnitude_db(magnitudes: &[f32]) -> Vec<f32> {
    magnitudes
        .iter()
        .map(|&m| (20.0 * (m as f64 + EPSILON).log10()) as f32)
        .collect()
}
