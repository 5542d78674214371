//! Playback instances and the pool that starts them.
//!
//! Every trigger gets its own [`PlaybackInstance`] with its own cursor and
//! volume; the decoded samples are shared. Two hits on the same asset
//! therefore overlap instead of cutting each other off.
//!
//! - [`PlaybackSink`]: the seam the dispatcher plays through
//! - [`PlaybackInstancePool`]: the real sink, feeding the [`Mixer`](crate::mixer::Mixer)
//!   over a command channel
//! - [`PlaybackCommand`]: commands for the mixer (internal)

use crate::assets::AudioAssetDescriptor;
use crate::audio_data::ImpactSonicAudioData;
use crate::config::ImpactSonicDesc;
use crate::error::{ImpactSonicError, Result};
use crate::events::{self, ImpactSonicEvent};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use uuid::Uuid;

/// Identifies one playback instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

/// Represents the current playback state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Stopped,
}

/// Playback position of an instance.
#[derive(Debug, Clone)]
pub struct PlaybackInfo {
    /// Current playback position in frames
    pub current_frame: usize,
    /// Total number of frames in the audio
    pub total_frames: usize,
    pub play_state: PlayState,
}

impl PlaybackInfo {
    pub fn new(total_frames: usize) -> Self {
        Self {
            current_frame: 0,
            total_frames,
            play_state: PlayState::Stopped,
        }
    }

    pub fn update_position(&mut self, current_frame: usize) {
        self.current_frame = current_frame.min(self.total_frames);
    }

    pub fn is_finished(&self) -> bool {
        self.current_frame >= self.total_frames
    }
}

/// One independent, time-bounded activation of a loaded asset.
#[derive(Debug)]
pub struct PlaybackInstance {
    pub id: InstanceId,
    pub asset_name: Arc<str>,
    pub audio_data: ImpactSonicAudioData,
    pub info: PlaybackInfo,
    volume: f32,
}

impl PlaybackInstance {
    pub fn new(asset_name: &str, audio_data: ImpactSonicAudioData) -> Self {
        let info = PlaybackInfo::new(audio_data.total_frames());
        Self {
            id: InstanceId::new(),
            asset_name: Arc::from(asset_name),
            audio_data,
            info,
            volume: 1.0,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Sets the volume, clamped to `[0, 1]`. Non-finite values mute.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn play(&mut self) {
        log::trace!("Instance {} of '{}' playing", self.id, self.asset_name);
        self.info.play_state = PlayState::Playing;
    }

    pub fn stop(&mut self) {
        log::trace!(
            "Instance {} of '{}' stopped at frame {}",
            self.id,
            self.asset_name,
            self.info.current_frame
        );
        self.info.play_state = PlayState::Stopped;
    }

    pub fn is_playing(&self) -> bool {
        self.info.play_state == PlayState::Playing
    }

    /// Mixes this instance into `buffer` (interleaved, `channels` wide) and
    /// advances the cursor. Returns the number of frames written.
    ///
    /// Reaching the last frame stops the instance.
    pub fn fill_buffer(&mut self, buffer: &mut [f32], channels: u16) -> usize {
        if !self.is_playing() {
            return 0;
        }

        let channels = channels as usize;
        let frame_count = buffer.len() / channels;
        let remaining = self.info.total_frames - self.info.current_frame;
        let frames = frame_count.min(remaining);

        for frame_idx in 0..frames {
            let source_frame = self.info.current_frame + frame_idx;
            for channel in 0..channels {
                buffer[frame_idx * channels + channel] +=
                    self.audio_data.sample_at(source_frame, channel) * self.volume;
            }
        }

        self.info.update_position(self.info.current_frame + frames);
        if self.info.is_finished() {
            self.info.play_state = PlayState::Stopped;
        }

        frames
    }
}

/// Commands sent to the mixer.
#[derive(Debug)]
pub enum PlaybackCommand {
    /// Start mixing a fresh instance
    Start(PlaybackInstance),
    /// Stop one instance
    Stop(InstanceId),
    /// Stop every active instance
    StopAll,
}

/// Something that can start playback of a loaded asset.
///
/// Starting is fire-and-forget: implementations must not wait for the sound
/// to finish.
pub trait PlaybackSink {
    /// Starts a new, independent instance of `asset` at `volume`.
    fn start(&self, asset: &AudioAssetDescriptor, volume: f32) -> Result<InstanceId>;
}

impl<S: PlaybackSink + ?Sized> PlaybackSink for Arc<S> {
    fn start(&self, asset: &AudioAssetDescriptor, volume: f32) -> Result<InstanceId> {
        (**self).start(asset, volume)
    }
}

impl<S: PlaybackSink + ?Sized> PlaybackSink for &S {
    fn start(&self, asset: &AudioAssetDescriptor, volume: f32) -> Result<InstanceId> {
        (**self).start(asset, volume)
    }
}

/// Creates one playback instance per trigger and hands it to the mixer.
///
/// At most `max_instances` commands wait for the mixer. While no mixer
/// drains them (engine stopped or never started) further starts are
/// dropped with [`ImpactSonicError::PlaybackQueueFull`] and an
/// [`ImpactSonicEvent::InstanceDropped`]. Events are kept up to
/// `event_capacity`; later ones are discarded until polled.
///
/// ```no_run
/// # use impactsonic::*;
/// let desc = ImpactSonicDesc::default();
/// let pool = PlaybackInstancePool::new(&desc);
/// let mut engine = ImpactSonicEngine::new(desc, &pool)?;
/// engine.start()?;
/// # Ok::<(), ImpactSonicError>(())
/// ```
pub struct PlaybackInstancePool {
    sample_rate: u32,
    command_sender: Sender<PlaybackCommand>,
    command_receiver: Receiver<PlaybackCommand>,
    event_sender: Sender<ImpactSonicEvent>,
    event_receiver: Receiver<ImpactSonicEvent>,
}

impl PlaybackInstancePool {
    pub fn new(desc: &ImpactSonicDesc) -> Self {
        let (command_sender, command_receiver) = crossbeam_channel::bounded(desc.max_instances);
        let (event_sender, event_receiver) = crossbeam_channel::bounded(desc.event_capacity);
        Self {
            sample_rate: desc.sample_rate,
            command_sender,
            command_receiver,
            event_sender,
            event_receiver,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stops one instance. Unknown or finished instances are ignored.
    pub fn stop(&self, instance: InstanceId) -> Result<()> {
        self.send(PlaybackCommand::Stop(instance))
    }

    /// Stops every instance currently mixing.
    pub fn stop_all(&self) -> Result<()> {
        self.send(PlaybackCommand::StopAll)
    }

    /// Drains the events emitted by the mixer and engine since the last call.
    pub fn poll_events(&self) -> Vec<ImpactSonicEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Receiver the mixer drains commands from.
    pub fn command_receiver(&self) -> &Receiver<PlaybackCommand> {
        &self.command_receiver
    }

    /// Sender the mixer and engine report events through.
    pub fn event_sender(&self) -> &Sender<ImpactSonicEvent> {
        &self.event_sender
    }

    fn send(&self, command: PlaybackCommand) -> Result<()> {
        self.command_sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                ImpactSonicError::Engine("Playback command queue is full".to_string())
            }
            TrySendError::Disconnected(_) => {
                ImpactSonicError::Engine("Playback command queue disconnected".to_string())
            }
        })
    }
}

impl PlaybackSink for PlaybackInstancePool {
    fn start(&self, asset: &AudioAssetDescriptor, volume: f32) -> Result<InstanceId> {
        let data = asset.asset().ok_or_else(|| {
            ImpactSonicError::Engine(format!("Asset '{}' is not loaded", asset.name()))
        })?;

        if data.sample_rate() != self.sample_rate {
            return Err(ImpactSonicError::AudioFormat(format!(
                "Asset '{}' is {} Hz but playback runs at {} Hz",
                asset.name(),
                data.sample_rate(),
                self.sample_rate
            )));
        }

        let mut instance = PlaybackInstance::new(asset.name(), data.clone());
        instance.set_volume(volume);
        instance.play();

        let id = instance.id;
        log::debug!(
            "Starting {} of '{}' at volume {:.2}",
            id,
            asset.name(),
            instance.volume()
        );
        match self.command_sender.try_send(PlaybackCommand::Start(instance)) {
            Ok(()) => Ok(id),
            Err(TrySendError::Full(_)) => {
                log::warn!(
                    "Playback queue full ({} pending), dropping {} of '{}'",
                    self.command_sender.len(),
                    id,
                    asset.name()
                );
                events::publish(
                    &self.event_sender,
                    ImpactSonicEvent::InstanceDropped {
                        instance_id: id,
                        asset: Arc::from(asset.name()),
                    },
                );
                Err(ImpactSonicError::PlaybackQueueFull(asset.name().to_string()))
            }
            Err(TrySendError::Disconnected(_)) => Err(ImpactSonicError::Engine(
                "Playback command queue disconnected".to_string(),
            )),
        }
    }
}
