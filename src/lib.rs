//! # ImpactSonic
//!
//! Collision-driven sound for 2D rigid-body simulations.
//!
//! Bodies carry a [`SoundConfig`]; when two bodies start touching, the
//! [`CollisionAudioDispatcher`] decides which of them sounds and starts an
//! independent [`PlaybackInstance`](playback::PlaybackInstance) for each,
//! so overlapping hits on the same asset never cut each other off.
//!
//! - **Main thread**: loads assets, owns the simulation, dispatches collisions
//! - **Audio thread**: the cpal callback of [`ImpactSonicEngine`] mixes active
//!   instances; commands and events cross over lock-free channels
//!
//! See [`plugin`] for the startup sequence.

pub mod assets;
pub mod audio_data;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod mixer;
pub mod playback;
pub mod plugin;
pub mod simulation;
pub mod sound;

pub use assets::{AssetLoadHandle, AssetManifest, AudioAssetDescriptor, LoadedAssets};
pub use audio_data::{AudioDataLoader, DefaultAudioLoader, ImpactSonicAudioData, LoadOptions};
pub use config::ImpactSonicDesc;
pub use dispatch::{CollisionAudioDispatcher, DispatchReport};
pub use engine::ImpactSonicEngine;
pub use error::{ImpactSonicError, Result};
pub use events::ImpactSonicEvent;
pub use playback::{InstanceId, PlaybackInstancePool, PlaybackSink};
pub use plugin::{DispatchStats, ImpactSonic};
pub use simulation::{Body, BodyId, CollisionPair, Simulation, SimulationHost};
pub use sound::{BodyAudio, PlayOptions, SoundBody, SoundConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::test_support::write_test_wav;
    use crate::mixer::Mixer;
    use std::sync::Arc;

    #[test]
    fn test_manifest_to_overlapping_playback() {
        let _ = env_logger::builder().is_test(true).try_init();

        let kick = write_test_wav("impactsonic_e2e_kick.wav", 44100, 2, 441);
        let desc = ImpactSonicDesc::default().channels(1).block_size(128);
        let manifest = AssetManifest::new().with("kick", kick.to_string_lossy());

        let assets = ImpactSonic::load(&desc, &manifest)
            .expect("manifest is valid")
            .wait()
            .expect("kick decodes");
        let kick_asset = assets.get("kick").and_then(|d| d.asset()).unwrap();
        assert_eq!(kick_asset.sample_rate(), 48000);
        assert_eq!(kick_asset.channels(), 2);

        let pool = Arc::new(PlaybackInstancePool::new(&desc));
        let mut mixer = Mixer::new(&desc, &pool);
        let plugin = ImpactSonic::new(desc, assets, pool.clone()).unwrap();

        let mut sim = Simulation::new();
        plugin.install(&mut sim);
        let x = sim.create_body("x", Some(SoundConfig::new().fixed_asset("kick")));
        let y = sim.create_body("y", None);

        sim.emit_collision_start(&[CollisionPair::new(x, y)]);
        let mut buffer = vec![0.0f32; 128];
        mixer.mix(&mut buffer);
        sim.emit_collision_start(&[CollisionPair::new(x, y)]);
        mixer.mix(&mut buffer);
        assert_eq!(mixer.active_count(), 2);

        for _ in 0..4 {
            mixer.mix(&mut buffer);
        }
        assert_eq!(mixer.active_count(), 0);

        let completed = pool
            .poll_events()
            .into_iter()
            .filter(|e| matches!(e, ImpactSonicEvent::InstanceCompleted { .. }))
            .count();
        assert_eq!(completed, 2);
        assert_eq!(plugin.stats().playbacks(), 2);
    }

    #[test]
    fn test_missing_name_fails_before_loading() {
        let manifest = AssetManifest::new()
            .with("kick", "kick.wav")
            .with("", "snare.wav");
        let result = ImpactSonic::load(&ImpactSonicDesc::default(), &manifest);
        assert!(matches!(
            result,
            Err(ImpactSonicError::InvalidAssetDescriptor { index: 1, .. })
        ));
    }

    #[test]
    fn test_failed_asset_fails_whole_load() {
        let good = write_test_wav("impactsonic_e2e_good.wav", 48000, 1, 64);
        let manifest = AssetManifest::new()
            .with("good", good.to_string_lossy())
            .with("gone", "/nonexistent/impactsonic/gone.wav");

        let result = ImpactSonic::load(&ImpactSonicDesc::default(), &manifest)
            .unwrap()
            .wait();

        match result {
            Err(ImpactSonicError::AssetLoad { name, .. }) => assert_eq!(name, "gone"),
            other => panic!("expected AssetLoad error, got {:?}", other.map(|a| a.len())),
        }
    }
}
