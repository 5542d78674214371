//! Plugin lifecycle: wires the dispatcher into a host simulation.
//!
//! Typical startup:
//!
//! ```no_run
//! # use impactsonic::*;
//! # use std::sync::Arc;
//! let desc = ImpactSonicDesc::default();
//! let manifest = AssetManifest::new().with("kick", "assets/kick.wav");
//! let assets = ImpactSonic::load(&desc, &manifest)?.wait()?;
//!
//! let pool = Arc::new(PlaybackInstancePool::new(&desc));
//! let mut engine = ImpactSonicEngine::new(desc.clone(), &pool)?;
//! engine.start()?;
//!
//! let plugin = ImpactSonic::new(desc, assets, pool)?;
//! let mut simulation = Simulation::new();
//! plugin.install(&mut simulation);
//! # Ok::<(), ImpactSonicError>(())
//! ```

use crate::assets::{AssetLoadHandle, AssetManifest, LoadedAssets};
use crate::audio_data::{AudioDataLoader, DefaultAudioLoader};
use crate::config::ImpactSonicDesc;
use crate::dispatch::{CollisionAudioDispatcher, DispatchReport};
use crate::error::Result;
use crate::playback::PlaybackSink;
use crate::simulation::{CollisionEvent, SimulationHost};
use crate::sound::{SoundBody, SoundConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type SharedSink = Arc<dyn PlaybackSink + Send + Sync>;

/// Counters updated by the installed hooks.
#[derive(Debug, Default)]
pub struct DispatchStats {
    bodies_attached: AtomicUsize,
    collisions_started: AtomicUsize,
    collisions_active: AtomicUsize,
    collisions_ended: AtomicUsize,
    playbacks: AtomicUsize,
    resolver_calls: AtomicUsize,
    errors: AtomicUsize,
}

impl DispatchStats {
    pub fn bodies_attached(&self) -> usize {
        self.bodies_attached.load(Ordering::Relaxed)
    }

    /// Collision pairs seen on the start stream.
    pub fn collisions_started(&self) -> usize {
        self.collisions_started.load(Ordering::Relaxed)
    }

    pub fn collisions_active(&self) -> usize {
        self.collisions_active.load(Ordering::Relaxed)
    }

    pub fn collisions_ended(&self) -> usize {
        self.collisions_ended.load(Ordering::Relaxed)
    }

    pub fn playbacks(&self) -> usize {
        self.playbacks.load(Ordering::Relaxed)
    }

    pub fn resolver_calls(&self) -> usize {
        self.resolver_calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    fn record_dispatch(&self, pairs: usize, report: &DispatchReport) {
        self.collisions_started.fetch_add(pairs, Ordering::Relaxed);
        self.playbacks
            .fetch_add(report.playback_count(), Ordering::Relaxed);
        self.resolver_calls
            .fetch_add(report.resolver_calls, Ordering::Relaxed);
        self.errors.fetch_add(report.errors.len(), Ordering::Relaxed);
    }
}

/// Layers `defaults` under whatever sound configuration `body` already has.
pub fn attach_sound(body: &mut dyn SoundBody, defaults: &SoundConfig) {
    let sound = body
        .sound_mut()
        .take()
        .unwrap_or_default()
        .layered_over(defaults);
    *body.sound_mut() = Some(sound);
}

/// The collision audio plugin.
///
/// Owns the loaded assets (through its dispatcher) and installs hooks on
/// any number of simulations. Every installed simulation shares the same
/// dispatcher and statistics.
pub struct ImpactSonic {
    desc: ImpactSonicDesc,
    dispatcher: Arc<CollisionAudioDispatcher<SharedSink>>,
    stats: Arc<DispatchStats>,
}

impl ImpactSonic {
    pub const NAME: &'static str = "impactsonic";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// Starts loading `manifest` from the file system.
    pub fn load(desc: &ImpactSonicDesc, manifest: &AssetManifest) -> Result<AssetLoadHandle> {
        Self::load_with(desc, manifest, Arc::new(DefaultAudioLoader))
    }

    /// Starts loading `manifest` through a custom loader.
    pub fn load_with(
        desc: &ImpactSonicDesc,
        manifest: &AssetManifest,
        loader: Arc<dyn AudioDataLoader + Send + Sync>,
    ) -> Result<AssetLoadHandle> {
        desc.validate()?;
        AssetLoadHandle::spawn(manifest, loader, desc.effective_load_options())
    }

    pub fn new(desc: ImpactSonicDesc, assets: LoadedAssets, sink: SharedSink) -> Result<Self> {
        desc.validate()?;
        let dispatcher =
            CollisionAudioDispatcher::new(Arc::new(assets), sink).with_volume(desc.collision_volume);

        log::info!(
            "{} {} ready with {} asset(s)",
            Self::NAME,
            Self::VERSION,
            dispatcher.assets().len()
        );

        Ok(Self {
            desc,
            dispatcher: Arc::new(dispatcher),
            stats: Arc::new(DispatchStats::default()),
        })
    }

    pub fn desc(&self) -> &ImpactSonicDesc {
        &self.desc
    }

    pub fn dispatcher(&self) -> &CollisionAudioDispatcher<SharedSink> {
        &self.dispatcher
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Stops reacting to new collisions on every installed simulation.
    pub fn stop(&self) {
        self.dispatcher.stop();
    }

    pub fn resume(&self) {
        self.dispatcher.resume();
    }

    /// Registers the plugin's hooks on `host`.
    ///
    /// - body created: attach the default sound configuration
    /// - collision start: dispatch audio
    /// - collision active / end: counted only
    pub fn install<H>(&self, host: &mut H)
    where
        H: SimulationHost + ?Sized,
    {
        let defaults = self.desc.default_sound.clone();
        let stats = self.stats.clone();
        host.on_body_created(Box::new(move |body: &mut H::Body| {
            attach_sound(body, &defaults);
            stats.bodies_attached.fetch_add(1, Ordering::Relaxed);
        }));

        let dispatcher = self.dispatcher.clone();
        let stats = self.stats.clone();
        host.on_collision_start(Box::new(
            move |event: &mut CollisionEvent<'_, H::Body>| {
                let report = dispatcher.dispatch(event);
                stats.record_dispatch(event.pairs.len(), &report);
            },
        ));

        let stats = self.stats.clone();
        host.on_collision_active(Box::new(
            move |event: &mut CollisionEvent<'_, H::Body>| {
                log::trace!("{} collision pair(s) active", event.pairs.len());
                stats
                    .collisions_active
                    .fetch_add(event.pairs.len(), Ordering::Relaxed);
            },
        ));

        let stats = self.stats.clone();
        host.on_collision_end(Box::new(
            move |event: &mut CollisionEvent<'_, H::Body>| {
                log::trace!("{} collision pair(s) ended", event.pairs.len());
                stats
                    .collisions_ended
                    .fetch_add(event.pairs.len(), Ordering::Relaxed);
            },
        ));

        log::debug!("{} installed on simulation", Self::NAME);
    }
}
