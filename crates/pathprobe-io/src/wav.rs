//! Capture and stimulus WAV files.
//!
//! Reads always yield mono `f32` in [-1, 1); writes take mono samples and
//! lay them out as mono or as the left channel of a stereo file.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use pathprobe_analysis::waveform::{Waveform, first_channel};
use std::path::Path;

/// Sample rate and bit depth of a file to write.
///
/// 32 bits are written as IEEE float, 16 and 24 as integer PCM. The channel
/// layout is chosen by the write function, not by the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample: 16, 24 or 32.
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// 32-bit float at `sample_rate`.
    pub fn mono_float(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            bits_per_sample: 32,
        }
    }

    fn is_float(self) -> bool {
        self.bits_per_sample == 32
    }

    fn for_channels(self, channels: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: if self.is_float() {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// What a WAV file declares about its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Channel count as stored.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Whether samples are IEEE float rather than integer PCM.
    pub float: bool,
    /// Frames per channel.
    pub frames: u64,
}

impl WavHeader {
    fn of<R: std::io::Read>(reader: &WavReader<R>) -> Self {
        let spec = reader.spec();
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            float: spec.sample_format == SampleFormat::Float,
            frames: u64::from(reader.len()) / u64::from(spec.channels.max(1)),
        }
    }

    /// Length in seconds, 0 for a zero sample rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.sample_rate as f64
        }
    }
}

/// Inspect a WAV header without decoding samples.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavHeader> {
    Ok(WavHeader::of(&WavReader::open(path)?))
}

/// Full-scale magnitude of an integer sample of `bits` bits.
fn int_full_scale(bits: u16) -> f32 {
    (1i64 << (bits.clamp(1, 32) - 1)) as f32
}

/// Decode the first channel of a WAV file as f32, with the file's header.
///
/// Integer samples are scaled to [-1, 1). A file without any samples is an
/// [`Error::EmptyFile`].
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavHeader)> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let header = WavHeader::of(&reader);

    let interleaved: Vec<f32> = if header.float {
        reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?
    } else {
        let full_scale = int_full_scale(header.bits_per_sample);
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / full_scale))
            .collect::<std::result::Result<_, _>>()?
    };

    let samples = first_channel(&interleaved, usize::from(header.channels));
    if samples.is_empty() {
        return Err(Error::EmptyFile(path.to_path_buf()));
    }

    tracing::debug!(
        path = %path.display(),
        sample_rate = header.sample_rate,
        channels = header.channels,
        float = header.float,
        frames = samples.len(),
        "read_wav"
    );
    Ok((samples, header))
}

/// Read a WAV file as a mono [`Waveform`] (first channel).
pub fn read_waveform<P: AsRef<Path>>(path: P) -> Result<Waveform> {
    let (samples, header) = read_wav(path)?;
    Ok(Waveform::new(samples, header.sample_rate))
}

fn write_channels<P: AsRef<Path>>(path: P, channels: &[&[f32]], spec: WavSpec) -> Result<()> {
    let layout = spec.for_channels(channels.len() as u16);
    let mut writer = WavWriter::create(path, layout)?;
    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);

    if spec.is_float() {
        for i in 0..frames {
            for channel in channels {
                writer.write_sample(channel[i])?;
            }
        }
    } else {
        let full_scale = int_full_scale(spec.bits_per_sample);
        for i in 0..frames {
            for channel in channels {
                let code = (channel[i] * full_scale).clamp(-full_scale, full_scale - 1.0);
                writer.write_sample(code as i32)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write mono samples to a WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    write_channels(path, &[samples], spec)
}

/// Write samples to the left channel of a stereo file, right channel silent.
///
/// This is the layout used for playback stimuli sent to a single-input device.
pub fn write_wav_stereo_silent_right<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    spec: WavSpec,
) -> Result<()> {
    let silence = vec![0.0f32; samples.len()];
    write_channels(path, &[samples, silence.as_slice()], spec)
}

/// Write a [`Waveform`] as a mono 32-bit float WAV file.
pub fn write_waveform<P: AsRef<Path>>(path: P, waveform: &Waveform) -> Result<()> {
    write_wav(
        path,
        waveform.samples(),
        WavSpec::mono_float(waveform.sample_rate()),
    )
}
