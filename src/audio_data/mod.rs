//! Decoded audio and the loaders that produce it.

mod default_loader;
mod load_options;
mod loader;
mod resampler;

use crate::error::{ImpactSonicError, Result};
pub use default_loader::DefaultAudioLoader;
pub use load_options::{ConvertToMono, LoadOptions};
pub use loader::AudioDataLoader;
pub use resampler::AudioResampler;
use std::sync::Arc;
use std::time::Duration;

/// Decoded, playable audio shared by every playback instance of one asset.
///
/// Samples are stored **interleaved** (`[L0, R0, L1, R1, ...]`). Cloning is
/// cheap; the sample buffer itself is never copied once decoded.
#[derive(Debug, Clone)]
pub struct ImpactSonicAudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
struct AudioDataInner {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl ImpactSonicAudioData {
    /// Wraps already decoded interleaved samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ImpactSonicError::AudioFormat(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(ImpactSonicError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(ImpactSonicError::AudioFormat(format!(
                "{} samples do not form whole frames of {} channels",
                samples.len(),
                channels
            )));
        }

        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);

        Ok(Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Returns the sample of `channel` at `frame`, mapping output channels
    /// beyond the source channel count back onto the source (mono fans out).
    pub(crate) fn sample_at(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.inner.channels as usize;
        self.inner.samples[frame * channels + channel % channels]
    }

    /// Convert to mono by averaging all channels
    pub fn to_mono(&self) -> Result<Self> {
        if self.inner.channels == 1 {
            return Ok(self.clone());
        }

        let channels = self.inner.channels as usize;
        let mono_samples: Vec<f32> = self
            .inner
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::from_samples(mono_samples, self.inner.sample_rate, 1)
    }

    /// Resample to a different sample rate using rubato
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;

        let resampled = resampler.resample_interleaved(&self.inner.samples)?;
        Self::from_samples(resampled, target_sample_rate, self.inner.channels)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::PathBuf;

    /// Writes a 16-bit PCM WAV file with a decaying sine into the temp dir.
    pub fn write_test_wav(name: &str, sample_rate: u32, channels: u16, frames: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "impactsonic_{}_{}.wav",
            std::process::id(),
            name
        ));

        let data_len = (frames * channels as usize * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());

        for frame in 0..frames {
            let t = frame as f32 / sample_rate as f32;
            let envelope = 1.0 - frame as f32 / frames as f32;
            let value = (t * 440.0 * std::f32::consts::TAU).sin() * envelope * 0.5;
            let sample = (value * i16::MAX as f32) as i16;
            for _ in 0..channels {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
        }

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        path
    }
}
