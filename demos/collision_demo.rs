//! Plays collision sounds for a ball bouncing between a wall and the floor.
//!
//! Usage: `cargo run --example collision_demo -- <hit.wav> [alt1.wav alt2.wav ...]`

use anyhow::{Context, Result, bail};
use impactsonic::{
    AssetManifest, CollisionPair, ImpactSonic, ImpactSonicDesc, ImpactSonicEngine,
    PlaybackInstancePool, Simulation, SoundConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: collision_demo <hit.wav> [alternate.wav ...]");
    }

    let mut manifest = AssetManifest::new().with("hit", paths[0].as_str());
    let mut alternates = Vec::new();
    for (i, path) in paths.iter().enumerate().skip(1) {
        let name = format!("alt{}", i);
        manifest = manifest.with(name.as_str(), path.as_str());
        alternates.push(name);
    }

    let desc = ImpactSonicDesc::default();
    log::info!("Loading {} asset(s)...", manifest.len());
    let assets = ImpactSonic::load(&desc, &manifest)?
        .wait()
        .context("failed to load collision sounds")?;

    let pool = Arc::new(PlaybackInstancePool::new(&desc));
    let mut engine = ImpactSonicEngine::new(desc.clone(), &pool)?;
    engine.start().context("failed to open audio output")?;

    let plugin = ImpactSonic::new(desc, assets, pool.clone())?;
    let mut sim = Simulation::new();
    plugin.install(&mut sim);

    // The ball is self-only: the wall and floor stay quiet when it hits them.
    let wall = sim.create_body("wall", Some(SoundConfig::new().fixed_asset("hit")));
    let floor = sim.create_body("floor", Some(SoundConfig::new().fixed_asset("hit")));
    let ball_sound = if alternates.is_empty() {
        SoundConfig::new().fixed_asset("hit").self_only(true)
    } else {
        SoundConfig::new().alternate_audios(alternates).self_only(true)
    };
    let ball = sim.create_body("ball", Some(ball_sound));

    for bounce in 0..6 {
        let target = if bounce % 2 == 0 { wall } else { floor };
        let pair = [CollisionPair::new(ball, target)];
        log::info!("Bounce {}: ball hits {}", bounce + 1, target);

        sim.emit_collision_start(&pair);
        std::thread::sleep(Duration::from_millis(120));
        sim.emit_collision_active(&pair);
        sim.emit_collision_end(&pair);
        std::thread::sleep(Duration::from_millis(280));

        for event in pool.poll_events() {
            log::debug!("{:?}", event);
        }
    }

    // Wall against floor: neither is self-only, so both sides sound.
    sim.emit_collision_start(&[CollisionPair::new(wall, floor)]);
    std::thread::sleep(Duration::from_secs(1));

    let stats = plugin.stats();
    log::info!(
        "{} collision(s), {} playback(s), {} error(s), {} frames rendered",
        stats.collisions_started(),
        stats.playbacks(),
        stats.errors(),
        engine.frames_processed()
    );

    engine.stop()?;
    Ok(())
}
