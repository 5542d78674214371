//! Configuration for ImpactSonic

use crate::audio_data::LoadOptions;
use crate::error::{ImpactSonicError, Result};
use crate::sound::SoundConfig;

#[derive(Debug, Clone)]
pub struct ImpactSonicDesc {
    /// Output sample rate; assets are resampled to it while loading
    pub sample_rate: u32,
    /// Frames per output block
    pub block_size: usize,
    /// Number of output channels (typically 2 for stereo)
    pub channels: u16,
    /// Maximum number of instances mixed at once; also bounds how many
    /// start commands may wait for the mixer
    pub max_instances: usize,
    /// Events kept until `poll_events`; newer events are dropped once full
    pub event_capacity: usize,
    /// Decoding options; `target_sample_rate` is forced to `sample_rate`
    pub load_options: LoadOptions,
    /// Sound configuration layered under every new body's own
    pub default_sound: SoundConfig,
    /// Volume passed to every collision playback
    pub collision_volume: f32,
}

impl Default for ImpactSonicDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 1024,
            channels: 2,
            max_instances: 64,
            event_capacity: 1024,
            load_options: LoadOptions::default(),
            default_sound: SoundConfig::default(),
            collision_volume: 1.0,
        }
    }
}

impl ImpactSonicDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn max_instances(mut self, max: usize) -> Self {
        self.max_instances = max;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    pub fn default_sound(mut self, sound: SoundConfig) -> Self {
        self.default_sound = sound;
        self
    }

    pub fn collision_volume(mut self, volume: f32) -> Self {
        self.collision_volume = volume;
        self
    }

    /// Load options with the target sample rate pinned to the output rate.
    pub fn effective_load_options(&self) -> LoadOptions {
        self.load_options.clone().target_sample_rate(self.sample_rate)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ImpactSonicError::Configuration(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(ImpactSonicError::Configuration(
                "channels must be greater than 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(ImpactSonicError::Configuration(
                "block_size must be greater than 0".to_string(),
            ));
        }
        if self.max_instances == 0 {
            return Err(ImpactSonicError::Configuration(
                "max_instances must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ImpactSonicError::Configuration(
                "event_capacity must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.collision_volume) {
            return Err(ImpactSonicError::Configuration(format!(
                "collision_volume {} is outside [0, 1]",
                self.collision_volume
            )));
        }
        Ok(())
    }
}
