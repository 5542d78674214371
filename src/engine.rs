//! Audio output for ImpactSonic

use crate::config::ImpactSonicDesc;
use crate::error::{ImpactSonicError, Result};
use crate::events::{self, ImpactSonicEvent};
use crate::mixer::Mixer;
use crate::playback::PlaybackInstancePool;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Plays the mixer through the default output device.
///
/// Collision playback never waits on the engine: instances are queued on
/// the pool and picked up by the next audio callback.
pub struct ImpactSonicEngine {
    desc: ImpactSonicDesc,
    stream: Option<cpal::Stream>,
    mixer: Arc<Mutex<Mixer>>,
    events: Sender<ImpactSonicEvent>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
}

impl ImpactSonicEngine {
    pub fn new(desc: ImpactSonicDesc, pool: &PlaybackInstancePool) -> Result<Self> {
        desc.validate()?;
        let mixer = Mixer::new(&desc, pool);
        Ok(Self {
            desc,
            stream: None,
            mixer: Arc::new(Mutex::new(mixer)),
            events: pool.event_sender().clone(),
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Opens the default output device and starts pulling from the mixer.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            ImpactSonicError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.block_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            ImpactSonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        log::info!(
            "Opening output device {} ({} Hz, {} channel(s), {:?})",
            device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            config.sample_rate.0,
            config.channels,
            default_config.sample_format()
        );

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config)?,
            other => {
                return Err(ImpactSonicError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream.play().map_err(|e| {
            ImpactSonicError::AudioDevice(format!("Failed to start stream: {}", e))
        })?;

        self.stream = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);
        events::publish(&self.events, ImpactSonicEvent::EngineStarted);

        Ok(())
    }

    /// Stops output. Queued and active instances stay in the mixer.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            events::publish(&self.events, ImpactSonicEvent::EngineStopped);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Number of audio frames produced since start
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &ImpactSonicDesc {
        &self.desc
    }

    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mixer = self.mixer.clone();
        let is_running = self.is_running.clone();
        let frames_processed = self.frames_processed.clone();
        let error_events = self.events.clone();
        let mut mix_buffer = vec![0.0f32; self.desc.block_size * self.desc.channels as usize];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let running = is_running.load(Ordering::Relaxed);
                    let frames = render(&mixer, running, data, &mut mix_buffer);
                    frames_processed.fetch_add(frames, Ordering::Relaxed);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    events::publish(
                        &error_events,
                        ImpactSonicEvent::EngineError {
                            error: err.to_string(),
                        },
                    );
                },
                None,
            )
            .map_err(|e| ImpactSonicError::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for ImpactSonicEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Fills `data` from the mixer in `scratch`-sized chunks and returns the
/// number of frames the mixer produced.
///
/// `scratch` is allocated once when the stream is built, so callbacks
/// larger than the requested block size are served without allocating.
/// Its length must be a whole number of frames.
fn render<T>(mixer: &Mutex<Mixer>, running: bool, data: &mut [T], scratch: &mut [f32]) -> usize
where
    T: SizedSample + FromSample<f32>,
{
    if scratch.is_empty() {
        return 0;
    }

    let mut guard = if running { mixer.try_lock().ok() } else { None };
    let mut frames = 0;
    for chunk in data.chunks_mut(scratch.len()) {
        let block = &mut scratch[..chunk.len()];
        match guard.as_mut() {
            Some(mixer) => frames += mixer.mix(block).frames_filled,
            None => block.fill(0.0),
        }
        for (out, &sample) in chunk.iter_mut().zip(block.iter()) {
            *out = T::from_sample(sample.clamp(-1.0, 1.0));
        }
    }
    frames
}
