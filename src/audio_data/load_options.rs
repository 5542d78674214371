use std::time::Duration;

/// Defines how to handle channel conversion while decoding an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertToMono {
    /// Keep original channels: stereo if input is stereo, mono if input is mono.
    Original,

    /// Force mono: channels are averaged frame by frame.
    ForceMono,
}

/// Options for controlling how an asset is decoded.
///
/// # Examples
///
/// ```no_run
/// # use impactsonic::audio_data::{LoadOptions, ConvertToMono};
/// let options = LoadOptions::new()
///     .convert_to_mono(ConvertToMono::ForceMono)
///     .target_sample_rate(48000);
/// ```
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How to handle mono conversion during loading.
    pub convert_to_mono: ConvertToMono,
    /// Target sample rate for resampling (None = keep original)
    pub target_sample_rate: Option<u32>,
    /// Maximum duration to decode (None = decode the entire file)
    pub max_duration: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            convert_to_mono: ConvertToMono::Original,
            target_sample_rate: None,
            max_duration: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_to_mono(mut self, convert: ConvertToMono) -> Self {
        self.convert_to_mono = convert;
        self
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}
