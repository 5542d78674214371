// Mixer module - sums every active playback instance into one output block

use crate::config::ImpactSonicDesc;
use crate::events::{self, ImpactSonicEvent};
use crate::playback::{InstanceId, PlaybackCommand, PlaybackInstance, PlaybackInstancePool};
use crossbeam_channel::{Receiver, Sender};

/// Sums below this magnitude pass through untouched
const SOFT_CLIP_KNEE: f32 = 0.8;

/// Bends `sample` smoothly into (-1, 1) once it passes the knee.
#[inline]
pub fn soft_clip(sample: f32) -> f32 {
    let magnitude = sample.abs();
    if magnitude <= SOFT_CLIP_KNEE {
        return sample;
    }
    let headroom = 1.0 - SOFT_CLIP_KNEE;
    let bent = SOFT_CLIP_KNEE + headroom * ((magnitude - SOFT_CLIP_KNEE) / headroom).tanh();
    bent.copysign(sample)
}

/// Result of one mix call
pub struct MixResult {
    pub frames_filled: usize,
    pub completed_instances: Vec<InstanceId>,
}

/// Owns the active playback instances on the audio side.
///
/// Commands from the [`PlaybackInstancePool`] are applied at the start of
/// every [`mix`](Mixer::mix) call; finished instances are retired at the end
/// and reported as [`ImpactSonicEvent::InstanceCompleted`].
pub struct Mixer {
    channels: u16,
    max_instances: usize,
    active: Vec<PlaybackInstance>,
    commands: Receiver<PlaybackCommand>,
    events: Sender<ImpactSonicEvent>,
}

impl Mixer {
    pub fn new(desc: &ImpactSonicDesc, pool: &PlaybackInstancePool) -> Self {
        Self {
            channels: desc.channels,
            max_instances: desc.max_instances,
            active: Vec::with_capacity(desc.max_instances),
            commands: pool.command_receiver().clone(),
            events: pool.event_sender().clone(),
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Applies pending commands, then overwrites `buffer` with the mix of
    /// every playing instance. The sum is soft clipped into [-1, 1].
    pub fn mix(&mut self, buffer: &mut [f32]) -> MixResult {
        self.apply_commands();

        buffer.fill(0.0);

        let mut frames_filled = 0;
        for instance in self.active.iter_mut() {
            let frames = instance.fill_buffer(buffer, self.channels);
            frames_filled = frames_filled.max(frames);
        }
        for sample in buffer.iter_mut() {
            *sample = soft_clip(*sample);
        }

        let mut completed_instances = Vec::new();
        self.active.retain(|instance| {
            if instance.info.is_finished() {
                completed_instances.push(instance.id);
                events::publish(
                    &self.events,
                    ImpactSonicEvent::InstanceCompleted {
                        instance_id: instance.id,
                        asset: instance.asset_name.clone(),
                    },
                );
                false
            } else {
                true
            }
        });

        if !completed_instances.is_empty() {
            log::trace!(
                "Mixer: retired {} finished instance(s), {} still active",
                completed_instances.len(),
                self.active.len()
            );
        }

        MixResult {
            frames_filled,
            completed_instances,
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                PlaybackCommand::Start(instance) => self.admit(instance),
                PlaybackCommand::Stop(id) => {
                    if let Some(position) = self.active.iter().position(|i| i.id == id) {
                        let mut instance = self.active.swap_remove(position);
                        instance.stop();
                        self.report_stopped(&instance);
                    }
                }
                PlaybackCommand::StopAll => {
                    for mut instance in std::mem::take(&mut self.active) {
                        instance.stop();
                        self.report_stopped(&instance);
                    }
                }
            }
        }
    }

    fn admit(&mut self, instance: PlaybackInstance) {
        if self.active.len() >= self.max_instances {
            log::warn!(
                "Mixer full ({} instances), dropping {} of '{}'",
                self.max_instances,
                instance.id,
                instance.asset_name
            );
            events::publish(
                &self.events,
                ImpactSonicEvent::InstanceDropped {
                    instance_id: instance.id,
                    asset: instance.asset_name,
                },
            );
            return;
        }

        events::publish(
            &self.events,
            ImpactSonicEvent::InstanceStarted {
                instance_id: instance.id,
                asset: instance.asset_name.clone(),
            },
        );
        self.active.push(instance);
    }

    fn report_stopped(&self, instance: &PlaybackInstance) {
        events::publish(
            &self.events,
            ImpactSonicEvent::InstanceStopped {
                instance_id: instance.id,
                asset: instance.asset_name.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AudioAssetDescriptor;
    use crate::audio_data::ImpactSonicAudioData;
    use crate::playback::PlaybackSink;

    fn setup(max_instances: usize) -> (PlaybackInstancePool, Mixer) {
        let desc = ImpactSonicDesc::default().channels(1).max_instances(max_instances);
        let pool = PlaybackInstancePool::new(&desc);
        let mixer = Mixer::new(&desc, &pool);
        (pool, mixer)
    }

    fn clicks(frames: usize) -> AudioAssetDescriptor {
        let data = ImpactSonicAudioData::from_samples(vec![0.25; frames], 48000, 1).unwrap();
        AudioAssetDescriptor::loaded("click", "click.wav", data)
    }

    #[test]
    fn test_overlapping_instances_both_play_to_completion() {
        let (pool, mut mixer) = setup(8);
        let click = clicks(100);
        let mut buffer = vec![0.0f32; 64];

        let first = pool.start(&click, 1.0).unwrap();
        mixer.mix(&mut buffer);
        assert_eq!(buffer[0], 0.25);

        // Second hit lands while the first is still sounding.
        let second = pool.start(&click, 1.0).unwrap();
        let result = mixer.mix(&mut buffer);
        assert_eq!(mixer.active_count(), 1);
        assert_eq!(result.completed_instances, vec![first]);
        // Frames 0..36 overlap (first has 36 frames left), then only the second.
        assert_eq!(buffer[0], 0.5);
        assert_eq!(buffer[35], 0.5);
        assert_eq!(buffer[36], 0.25);

        let mut completed = Vec::new();
        for _ in 0..4 {
            completed.extend(mixer.mix(&mut buffer).completed_instances);
        }

        assert_eq!(mixer.active_count(), 0);
        assert_eq!(completed, vec![second]);
        assert_eq!(result.frames_filled, 64);

        let events = pool.poll_events();
        let completed_ids: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ImpactSonicEvent::InstanceCompleted { .. }))
            .filter_map(ImpactSonicEvent::instance_id)
            .collect();
        assert_eq!(completed_ids, vec![first, second]);
    }

    #[test]
    fn test_full_mixer_drops_new_instances() {
        let (pool, mut mixer) = setup(1);
        let click = clicks(1000);
        let mut buffer = vec![0.0f32; 16];

        pool.start(&click, 1.0).unwrap();
        mixer.mix(&mut buffer);
        let dropped = pool.start(&click, 1.0).unwrap();
        mixer.mix(&mut buffer);

        assert_eq!(mixer.active_count(), 1);
        let events = pool.poll_events();
        assert!(events.iter().any(|e| e.is_error() && e.instance_id() == Some(dropped)));
    }

    #[test]
    fn test_stop_all_clears_active_instances() {
        let (pool, mut mixer) = setup(8);
        let click = clicks(1000);
        let mut buffer = vec![0.0f32; 16];

        pool.start(&click, 1.0).unwrap();
        pool.start(&click, 1.0).unwrap();
        mixer.mix(&mut buffer);
        assert_eq!(mixer.active_count(), 2);

        pool.stop_all().unwrap();
        mixer.mix(&mut buffer);
        assert_eq!(mixer.active_count(), 0);
        assert!(buffer.iter().all(|&s| s == 0.0));

        let stopped = pool
            .poll_events()
            .into_iter()
            .filter(|e| matches!(e, ImpactSonicEvent::InstanceStopped { .. }))
            .count();
        assert_eq!(stopped, 2);
    }

    #[test]
    fn test_stop_single_instance() {
        let (pool, mut mixer) = setup(8);
        let click = clicks(1000);
        let mut buffer = vec![0.0f32; 16];

        let keep = pool.start(&click, 1.0).unwrap();
        let stop = pool.start(&click, 1.0).unwrap();
        mixer.mix(&mut buffer);

        pool.stop(stop).unwrap();
        mixer.mix(&mut buffer);
        assert_eq!(mixer.active_count(), 1);
        assert_eq!(buffer[0], 0.25);
        assert_ne!(keep, stop);
    }

    #[test]
    fn test_soft_clip_keeps_quiet_sums_and_bounds_loud_ones() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert_eq!(soft_clip(-0.8), -0.8);
        assert!(soft_clip(0.9) > 0.8 && soft_clip(0.9) < 0.9);
        assert!(soft_clip(16.0) <= 1.0);
        assert!(soft_clip(-16.0) >= -1.0);
        assert!(soft_clip(1.2) < soft_clip(1.5));
    }

    #[test]
    fn test_backlog_is_capped_and_mix_stays_in_range() {
        let max_instances = 8;
        let (pool, _) = setup(max_instances);
        let click = ImpactSonicAudioData::from_samples(vec![1.0; 256], 48000, 1).unwrap();
        let click = AudioAssetDescriptor::loaded("click", "click.wav", click);

        // Nothing drains the queue yet, as when the engine has not started.
        let started = (0..1000).filter(|_| pool.start(&click, 1.0).is_ok()).count();
        assert_eq!(started, max_instances);
        assert_eq!(pool.command_receiver().len(), max_instances);

        let mut mixer = Mixer::new(
            &ImpactSonicDesc::default()
                .channels(1)
                .max_instances(max_instances),
            &pool,
        );
        let mut buffer = vec![0.0f32; 128];
        mixer.mix(&mut buffer);

        assert_eq!(mixer.active_count(), max_instances);
        assert!(pool.command_receiver().is_empty());
        assert!(buffer.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(buffer[0] > SOFT_CLIP_KNEE);
    }
}
