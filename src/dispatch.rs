//! Collision-to-audio dispatch.
//!
//! [`CollisionAudioDispatcher`] turns each collision pair into zero, one or
//! two playbacks:
//!
//! 1. body A has `self_only`: only A sounds, with B as the other body
//! 2. otherwise body B has `self_only`: only B sounds, with A as the other body
//! 3. otherwise both sound, each with the other as the other body
//!
//! Per body, a fixed asset is looked up by name and played; a resolver is
//! called instead of any lookup. Alternate audios rotate independently of
//! both. Nothing that goes wrong for one body escapes the dispatch call: it
//! is logged and collected in the [`DispatchReport`].

use crate::assets::LoadedAssets;
use crate::error::ImpactSonicError;
use crate::playback::{InstanceId, PlaybackSink};
use crate::simulation::CollisionEvent;
use crate::sound::{BodyAudio, PlayOptions, SoundBody};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What one dispatch call did.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Instances started, in order
    pub playbacks: Vec<InstanceId>,
    /// Number of dynamic resolvers invoked
    pub resolver_calls: usize,
    /// Per-body problems; none of them interrupted the dispatch
    pub errors: Vec<ImpactSonicError>,
}

impl DispatchReport {
    pub fn playback_count(&self) -> usize {
        self.playbacks.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn absorb(&mut self, other: DispatchReport) {
        self.playbacks.extend(other.playbacks);
        self.resolver_calls += other.resolver_calls;
        self.errors.extend(other.errors);
    }
}

/// Maps collision pairs to playbacks on a [`PlaybackSink`].
///
/// Built from [`LoadedAssets`] only, so it cannot be wired to live
/// collisions before loading has resolved.
pub struct CollisionAudioDispatcher<S> {
    assets: Arc<LoadedAssets>,
    sink: S,
    volume: f32,
    enabled: AtomicBool,
}

impl<S: PlaybackSink> CollisionAudioDispatcher<S> {
    pub fn new(assets: Arc<LoadedAssets>, sink: S) -> Self {
        Self {
            assets,
            sink,
            volume: 1.0,
            enabled: AtomicBool::new(true),
        }
    }

    /// Volume handed to every playback. Defaults to 1.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn assets(&self) -> &LoadedAssets {
        &self.assets
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Stops processing new collisions. Instances already started keep
    /// playing.
    pub fn stop(&self) {
        if self.enabled.swap(false, Ordering::Relaxed) {
            log::info!("Collision audio dispatch stopped");
        }
    }

    pub fn resume(&self) {
        if !self.enabled.swap(true, Ordering::Relaxed) {
            log::info!("Collision audio dispatch resumed");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Handles one collision-start notification, pair by pair.
    pub fn dispatch<B: SoundBody>(&self, event: &mut CollisionEvent<'_, B>) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !self.is_enabled() {
            return report;
        }

        for pair in event.pairs {
            match event.bodies.get_pair_mut(pair.body_a, pair.body_b) {
                Some((a, b)) => report.absorb(self.dispatch_pair(a, b)),
                None => {
                    log::warn!(
                        "Skipping collision between {} and {}: bodies not found",
                        pair.body_a,
                        pair.body_b
                    );
                    report.errors.push(ImpactSonicError::InvalidCollisionPair(format!(
                        "{} <-> {}",
                        pair.body_a, pair.body_b
                    )));
                }
            }
        }

        report
    }

    /// Applies the `self_only` policy to one pair.
    pub fn dispatch_pair(&self, a: &mut dyn SoundBody, b: &mut dyn SoundBody) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !self.is_enabled() {
            return report;
        }

        let options = PlayOptions::with_volume(self.volume);
        let a_only = a.sound().is_some_and(|s| s.is_self_only());
        let b_only = b.sound().is_some_and(|s| s.is_self_only());

        log::trace!(
            "Collision {} '{}' <-> {} '{}'",
            a.body_id(),
            a.label(),
            b.body_id(),
            b.label()
        );

        if a_only {
            report.absorb(self.play_body_collision_audio(a, &*b, &options));
        } else if b_only {
            report.absorb(self.play_body_collision_audio(b, &*a, &options));
        } else {
            report.absorb(self.play_body_collision_audio(a, &*b, &options));
            report.absorb(self.play_body_collision_audio(b, &*a, &options));
        }

        report
    }

    /// Plays whatever `body` sounds like when it hits `other`.
    ///
    /// Advances the body's alternation cursor when an alternate asset was
    /// found.
    pub fn play_body_collision_audio(
        &self,
        body: &mut dyn SoundBody,
        other: &dyn SoundBody,
        options: &PlayOptions,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(sound) = body.sound() else {
            return report;
        };

        match &sound.audio {
            Some(BodyAudio::FixedAsset(name)) => match self.assets.get(name) {
                Some(asset) => match self.sink.start(asset, options.volume) {
                    Ok(id) => report.playbacks.push(id),
                    Err(e) => {
                        log::warn!("Failed to play '{}' for {}: {}", name, body.body_id(), e);
                        report.errors.push(e);
                    }
                },
                None => {
                    log::debug!(
                        "{} references unknown asset '{}', skipping",
                        body.body_id(),
                        name
                    );
                    report
                        .errors
                        .push(ImpactSonicError::UnknownAssetReference(name.clone()));
                }
            },
            Some(BodyAudio::DynamicResolver(resolver)) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    resolver(&*body, other, options)
                }));
                report.resolver_calls += 1;
                let reason = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(payload) => Some(panic_message(payload.as_ref())),
                };
                if let Some(reason) = reason {
                    log::warn!("Resolver for {} failed: {}", body.body_id(), reason);
                    report.errors.push(ImpactSonicError::Resolver {
                        body: body.body_id().to_string(),
                        reason,
                    });
                }
            }
            None => {}
        }

        let Some(index) = sound.next_alternate_index() else {
            return report;
        };
        let Some(name) = sound.alternate_at(index).map(str::to_owned) else {
            return report;
        };

        let Some(asset) = self.assets.get(&name) else {
            log::error!(
                "{} alternate audio '{}' (index {}) is not a loaded asset",
                body.body_id(),
                name,
                index
            );
            report
                .errors
                .push(ImpactSonicError::MissingAlternateAsset { name, index });
            return report;
        };

        match self.sink.start(asset, options.volume) {
            Ok(id) => report.playbacks.push(id),
            Err(e) => {
                log::warn!("Failed to play alternate '{}' for {}: {}", name, body.body_id(), e);
                report.errors.push(e);
            }
        }
        if let Some(sound) = body.sound_mut().as_mut() {
            sound.current_audio_index = Some(index);
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AudioAssetDescriptor;
    use crate::audio_data::ImpactSonicAudioData;
    use crate::error::Result;
    use crate::simulation::{Body, BodyId, CollisionPair};
    use crate::sound::SoundConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        started: Mutex<Vec<(String, f32)>>,
        fail_on: Option<String>,
    }

    impl RecordingSink {
        fn played(&self) -> Vec<String> {
            self.started
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    impl PlaybackSink for RecordingSink {
        fn start(&self, asset: &AudioAssetDescriptor, volume: f32) -> Result<InstanceId> {
            if self.fail_on.as_deref() == Some(asset.name()) {
                return Err(ImpactSonicError::Engine("sink closed".into()));
            }
            self.started
                .lock()
                .unwrap()
                .push((asset.name().to_string(), volume));
            Ok(InstanceId::new())
        }
    }

    fn assets(names: &[&str]) -> Arc<LoadedAssets> {
        let data = ImpactSonicAudioData::from_samples(vec![0.1; 32], 48000, 1).unwrap();
        let descriptors = names
            .iter()
            .map(|n| AudioAssetDescriptor::loaded(*n, format!("{}.wav", n), data.clone()))
            .collect();
        Arc::new(LoadedAssets::from_descriptors(descriptors).unwrap())
    }

    fn dispatcher(names: &[&str]) -> CollisionAudioDispatcher<Arc<RecordingSink>> {
        CollisionAudioDispatcher::new(assets(names), Arc::new(RecordingSink::default()))
    }

    fn body(id: u64, label: &str, sound: SoundConfig) -> Body {
        Body::new(BodyId::new(id), label).with_sound(sound)
    }

    #[test]
    fn test_self_only_side_a_plays_alone() {
        let dispatcher = dispatcher(&["ball", "wall"]);
        let mut a = body(0, "ball", SoundConfig::new().fixed_asset("ball").self_only(true));
        let mut b = body(1, "wall", SoundConfig::new().fixed_asset("wall"));

        let report = dispatcher.dispatch_pair(&mut a, &mut b);

        assert_eq!(report.playback_count(), 1);
        assert_eq!(dispatcher.sink().played(), vec!["ball"]);
    }

    #[test]
    fn test_self_only_side_b_plays_alone() {
        let dispatcher = dispatcher(&["ball", "wall"]);
        let mut a = body(0, "ball", SoundConfig::new().fixed_asset("ball"));
        let mut b = body(1, "wall", SoundConfig::new().fixed_asset("wall").self_only(true));

        dispatcher.dispatch_pair(&mut a, &mut b);

        assert_eq!(dispatcher.sink().played(), vec!["wall"]);
    }

    #[test]
    fn test_both_sides_sound_with_each_other_as_other_body() {
        let dispatcher = dispatcher(&[]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorder = |seen: Arc<Mutex<Vec<(String, String)>>>| {
            SoundConfig::new().resolver(move |body, other, _| {
                seen.lock()
                    .unwrap()
                    .push((body.label().to_string(), other.label().to_string()));
                Ok(())
            })
        };
        let mut a = body(0, "ball", recorder(seen.clone()));
        let mut b = body(1, "crate", recorder(seen.clone()));

        let report = dispatcher.dispatch_pair(&mut a, &mut b);

        assert_eq!(report.resolver_calls, 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("ball".to_string(), "crate".to_string()),
                ("crate".to_string(), "ball".to_string())
            ]
        );
    }

    #[test]
    fn test_resolver_replaces_default_lookup() {
        let dispatcher = dispatcher(&["kick"]);
        let volumes = Arc::new(Mutex::new(Vec::new()));
        let captured = volumes.clone();
        let mut a = body(
            0,
            "bell",
            SoundConfig::new()
                .resolver(move |_, _, options| {
                    captured.lock().unwrap().push(options.volume);
                    Ok(())
                })
                .self_only(true),
        );
        let mut b = body(1, "floor", SoundConfig::new().fixed_asset("kick"));

        let report = dispatcher.dispatch_pair(&mut a, &mut b);

        assert!(report.playbacks.is_empty());
        assert!(dispatcher.sink().played().is_empty());
        assert_eq!(*volumes.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_alternates_rotate_and_wrap() {
        let dispatcher = dispatcher(&["a", "b", "c"]);
        let mut x = body(0, "x", SoundConfig::new().alternate_audios(["a", "b", "c"]));
        let mut y = body(1, "y", SoundConfig::new());

        for _ in 0..4 {
            dispatcher.dispatch_pair(&mut x, &mut y);
        }

        assert_eq!(dispatcher.sink().played(), vec!["a", "b", "c", "a"]);
        assert_eq!(x.sound().unwrap().current_audio_index, Some(0));
    }

    #[test]
    fn test_fixed_asset_and_alternates_both_play() {
        let dispatcher = dispatcher(&["kick", "a", "b"]);
        let mut x = body(
            0,
            "x",
            SoundConfig::new().fixed_asset("kick").alternate_audios(["a", "b"]),
        );
        let mut y = body(1, "y", SoundConfig::new());

        dispatcher.dispatch_pair(&mut x, &mut y);
        dispatcher.dispatch_pair(&mut x, &mut y);

        assert_eq!(dispatcher.sink().played(), vec!["kick", "a", "kick", "b"]);
    }

    #[test]
    fn test_unknown_fixed_asset_is_silent() {
        let dispatcher = dispatcher(&["kick"]);
        let mut x = body(0, "x", SoundConfig::new().fixed_asset("nope"));
        let mut y = body(1, "y", SoundConfig::new());

        let report = dispatcher.dispatch_pair(&mut x, &mut y);

        assert!(report.playbacks.is_empty());
        assert!(dispatcher.sink().played().is_empty());
        assert!(matches!(
            report.errors.as_slice(),
            [ImpactSonicError::UnknownAssetReference(name)] if name == "nope"
        ));
    }

    #[test]
    fn test_missing_alternate_is_reported_and_index_kept() {
        let dispatcher = dispatcher(&["a"]);
        let mut config = SoundConfig::new().alternate_audios(["a", "ghost"]);
        config.current_audio_index = Some(0);
        let mut x = body(0, "x", config);
        let mut y = body(1, "y", SoundConfig::new());

        let report = dispatcher.dispatch_pair(&mut x, &mut y);

        assert!(report.playbacks.is_empty());
        assert!(matches!(
            report.errors.as_slice(),
            [ImpactSonicError::MissingAlternateAsset { name, index: 1 }] if name == "ghost"
        ));
        assert_eq!(x.sound().unwrap().current_audio_index, Some(0));
    }

    #[test]
    fn test_body_without_sound_is_silent() {
        let dispatcher = dispatcher(&["kick"]);
        let mut x = Body::new(BodyId::new(0), "x");
        let mut y = body(1, "y", SoundConfig::new().fixed_asset("kick"));

        let report = dispatcher.dispatch_pair(&mut x, &mut y);

        assert_eq!(dispatcher.sink().played(), vec!["kick"]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_errors_do_not_abort_the_batch() {
        let sink = Arc::new(RecordingSink {
            fail_on: Some("broken".into()),
            ..Default::default()
        });
        let dispatcher = CollisionAudioDispatcher::new(assets(&["broken", "kick"]), sink.clone());
        let mut bodies = vec![
            body(0, "a", SoundConfig::new().fixed_asset("broken").self_only(true)),
            body(1, "b", SoundConfig::new()),
            body(2, "c", SoundConfig::new().fixed_asset("kick").self_only(true)),
        ];
        let pairs = [
            CollisionPair::new(BodyId::new(0), BodyId::new(1)),
            CollisionPair::new(BodyId::new(1), BodyId::new(7)),
            CollisionPair::new(BodyId::new(2), BodyId::new(1)),
        ];
        let mut event: CollisionEvent<'_, Body> = CollisionEvent {
            pairs: &pairs,
            bodies: &mut bodies,
        };

        let report = dispatcher.dispatch(&mut event);

        assert_eq!(sink.played(), vec!["kick"]);
        assert_eq!(report.playback_count(), 1);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[0], ImpactSonicError::Engine(_)));
        assert!(matches!(
            report.errors[1],
            ImpactSonicError::InvalidCollisionPair(_)
        ));
    }

    #[test]
    fn test_failing_resolver_is_reported() {
        let dispatcher = dispatcher(&["kick"]);
        let mut x = body(
            0,
            "x",
            SoundConfig::new().resolver(|_, other, _| {
                Err(ImpactSonicError::UnknownAssetReference(format!(
                    "{}-hit",
                    other.label()
                )))
            }),
        );
        let mut y = body(1, "y", SoundConfig::new().fixed_asset("kick"));

        let report = dispatcher.dispatch_pair(&mut x, &mut y);

        assert_eq!(report.resolver_calls, 1);
        assert_eq!(dispatcher.sink().played(), vec!["kick"]);
        assert_eq!(report.errors.len(), 1);
        match &report.errors[0] {
            ImpactSonicError::Resolver { body, reason } => {
                assert_eq!(body, &BodyId::new(0).to_string());
                assert!(reason.contains("y-hit"));
            }
            other => panic!("expected Resolver error, got {:?}", other),
        }
    }

    #[test]
    fn test_panicking_resolver_does_not_abort_the_batch() {
        let dispatcher = dispatcher(&["kick"]);
        let mut bodies = vec![
            body(
                0,
                "a",
                SoundConfig::new()
                    .resolver(|_, _, _| panic!("resolver exploded"))
                    .self_only(true),
            ),
            body(1, "b", SoundConfig::new()),
            body(2, "c", SoundConfig::new().fixed_asset("kick").self_only(true)),
        ];
        let pairs = [
            CollisionPair::new(BodyId::new(0), BodyId::new(1)),
            CollisionPair::new(BodyId::new(2), BodyId::new(1)),
        ];
        let mut event: CollisionEvent<'_, Body> = CollisionEvent {
            pairs: &pairs,
            bodies: &mut bodies,
        };

        let report = dispatcher.dispatch(&mut event);

        assert_eq!(dispatcher.sink().played(), vec!["kick"]);
        assert_eq!(report.resolver_calls, 1);
        assert!(matches!(
            &report.errors[..],
            [ImpactSonicError::Resolver { reason, .. }] if reason == "resolver exploded"
        ));
        assert!(!report.errors[0].is_fatal());
    }

    #[test]
    fn test_stopped_dispatcher_ignores_collisions() {
        let dispatcher = dispatcher(&["kick"]);
        let mut x = body(0, "x", SoundConfig::new().fixed_asset("kick"));
        let mut y = body(1, "y", SoundConfig::new());

        dispatcher.stop();
        assert!(!dispatcher.is_enabled());
        dispatcher.dispatch_pair(&mut x, &mut y);
        assert!(dispatcher.sink().played().is_empty());

        dispatcher.resume();
        dispatcher.dispatch_pair(&mut x, &mut y);
        assert_eq!(dispatcher.sink().played(), vec!["kick"]);
    }

    #[test]
    fn test_configured_volume_is_passed_through() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher =
            CollisionAudioDispatcher::new(assets(&["kick"]), sink.clone()).with_volume(0.4);
        let mut x = body(0, "x", SoundConfig::new().fixed_asset("kick"));
        let mut y = body(1, "y", SoundConfig::new());

        dispatcher.dispatch_pair(&mut x, &mut y);

        assert_eq!(*sink.started.lock().unwrap(), vec![("kick".to_string(), 0.4)]);
    }
}
