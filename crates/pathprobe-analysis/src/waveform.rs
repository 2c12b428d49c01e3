//! Mono waveform buffers and channel reduction.

use serde::{Deserialize, Serialize};

/// Longest fade ramp applied by [`Waveform::faded`].
pub const MAX_FADE_SAMPLES: usize = 256;

/// A mono buffer of f32 samples paired with its sample rate.
///
/// Analyzers never mutate a waveform; every transformation returns a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a waveform from interleaved multi-channel data, keeping channel 0.
    pub fn from_interleaved(data: &[f32], channels: usize, sample_rate: u32) -> Self {
        Self::new(first_channel(data, channels), sample_rate)
    }

    /// Build a waveform from stereo frames, keeping the left channel.
    pub fn from_frames(frames: &[[f32; 2]], sample_rate: u32) -> Self {
        Self::new(frames.iter().map(|f| f[0]).collect(), sample_rate)
    }

    /// Sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the waveform and return its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the waveform holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Copy with a linear fade-in and fade-out applied to the buffer edges.
    ///
    /// The ramp is `min(256, len / 10)` samples long. Playback and export
    /// call this on stimuli; synthesis itself never fades.
    pub fn faded(&self) -> Self {
        let mut samples = self.samples.clone();
        let ramp = MAX_FADE_SAMPLES.min(samples.len() / 10);
        if ramp > 0 {
            let n = samples.len();
            for i in 0..ramp {
                let gain = i as f32 / ramp as f32;
                samples[i] *= gain;
                samples[n - 1 - i] *= gain;
            }
        }
        Self::new(samples, self.sample_rate)
    }
}

/// Reduce interleaved multi-channel data to its first channel.
///
/// `channels == 0` is treated as mono.
pub fn first_channel(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels).map(|frame| frame[0]).collect()
}
