use super::manifest::{AssetManifest, AudioAssetDescriptor};
use super::signal::{LoadOutcome, LoadSignalSender};
use crate::audio_data::{AudioDataLoader, ImpactSonicAudioData, LoadOptions};
use crate::error::{ImpactSonicError, Result};
use crossbeam_channel::{Receiver, TryRecvError, unbounded};
use std::collections::HashMap;
use std::sync::Arc;

/// The immutable set of loaded assets, keyed by name.
///
/// Built once when loading resolves and only read afterwards, so it is
/// shared freely (`Arc<LoadedAssets>`) between dispatchers.
#[derive(Debug, Clone, Default)]
pub struct LoadedAssets {
    descriptors: Vec<AudioAssetDescriptor>,
    by_name: HashMap<String, usize>,
}

impl LoadedAssets {
    /// Builds a set from descriptors that are already loaded.
    ///
    /// Descriptors without audio are rejected, as are repeated names.
    pub fn from_descriptors(descriptors: Vec<AudioAssetDescriptor>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            if !descriptor.is_loaded() {
                return Err(ImpactSonicError::InvalidAssetDescriptor {
                    index,
                    reason: format!("asset '{}' has not been loaded", descriptor.name()),
                });
            }
            if by_name.insert(descriptor.name().to_string(), index).is_some() {
                return Err(ImpactSonicError::InvalidAssetDescriptor {
                    index,
                    reason: format!("duplicate asset name '{}'", descriptor.name()),
                });
            }
        }

        Ok(Self {
            descriptors,
            by_name,
        })
    }

    pub fn get(&self, name: &str) -> Option<&AudioAssetDescriptor> {
        self.by_name.get(name).map(|&index| &self.descriptors[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Descriptors in manifest order.
    pub fn descriptors(&self) -> &[AudioAssetDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Readiness of an in-flight manifest load.
///
/// Dropping the handle abandons the load: loader threads run to completion
/// but their results are discarded.
pub struct AssetLoadHandle {
    descriptors: Vec<AudioAssetDescriptor>,
    remaining: usize,
    outcomes: Receiver<LoadOutcome>,
    resolved: bool,
}

impl AssetLoadHandle {
    /// Validates `manifest` and starts loading every entry.
    ///
    /// Fails with [`ImpactSonicError::InvalidAssetDescriptor`] before any load
    /// starts if an entry is malformed.
    pub fn spawn(
        manifest: &AssetManifest,
        loader: Arc<dyn AudioDataLoader + Send + Sync>,
        options: LoadOptions,
    ) -> Result<Self> {
        manifest.validate()?;

        let (sender, outcomes) = unbounded();
        let descriptors: Vec<_> = manifest
            .entries()
            .iter()
            .map(AudioAssetDescriptor::pending)
            .collect();

        log::info!("Loading {} audio asset(s)", descriptors.len());

        for (index, entry) in manifest.entries().iter().enumerate() {
            let signals = LoadSignalSender::new(index, &entry.name, options.clone(), sender.clone());
            let loader = loader.clone();
            let source = entry.src.clone();
            let options = options.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("impactsonic-load-{}", entry.name))
                .spawn(move || loader.load(&source, &options, signals));

            // A failed spawn drops `signals` unsettled, which reports the failure.
            if let Err(e) = spawned {
                log::error!("Failed to spawn loader thread for '{}': {}", entry.name, e);
            }
        }

        Ok(Self {
            remaining: descriptors.len(),
            descriptors,
            outcomes,
            resolved: false,
        })
    }

    /// Number of assets that have not settled yet.
    pub fn pending(&self) -> usize {
        self.remaining
    }

    /// Blocks until every asset is playable or one of them fails.
    pub fn wait(mut self) -> Result<LoadedAssets> {
        while self.remaining > 0 {
            let outcome = self.outcomes.recv().map_err(|_| {
                ImpactSonicError::Engine("asset loaders disconnected before finishing".to_string())
            })?;
            self.apply(outcome)?;
        }
        self.finish()
    }

    /// Non-blocking poll. Returns `None` while assets are still loading.
    ///
    /// Once this has returned `Some`, the handle is spent and later calls
    /// report an engine error.
    pub fn try_wait(&mut self) -> Option<Result<LoadedAssets>> {
        if self.resolved {
            return Some(Err(ImpactSonicError::Engine(
                "asset load already resolved".to_string(),
            )));
        }

        while self.remaining > 0 {
            match self.outcomes.try_recv() {
                Ok(outcome) => {
                    if let Err(e) = self.apply(outcome) {
                        self.resolved = true;
                        return Some(Err(e));
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.resolved = true;
                    return Some(Err(ImpactSonicError::Engine(
                        "asset loaders disconnected before finishing".to_string(),
                    )));
                }
            }
        }

        self.resolved = true;
        Some(self.finish())
    }

    fn apply(&mut self, outcome: LoadOutcome) -> Result<()> {
        let descriptor = &mut self.descriptors[outcome.index];

        match outcome.result {
            Ok(data) => {
                log_loaded(descriptor.name(), &data);
                descriptor.set_asset(data);
                self.remaining -= 1;
                Ok(())
            }
            Err(reason) => {
                log::error!("Asset '{}' failed to load: {}", descriptor.name(), reason);
                Err(ImpactSonicError::AssetLoad {
                    name: descriptor.name().to_string(),
                    reason,
                })
            }
        }
    }

    fn finish(&mut self) -> Result<LoadedAssets> {
        let descriptors = std::mem::take(&mut self.descriptors);
        let assets = LoadedAssets::from_descriptors(descriptors)?;
        log::info!("All {} audio asset(s) ready", assets.len());
        Ok(assets)
    }
}

fn log_loaded(name: &str, data: &ImpactSonicAudioData) {
    log::debug!(
        "Asset '{}' ready: {:?}, {} Hz, {} channel(s)",
        name,
        data.duration(),
        data.sample_rate(),
        data.channels()
    );
}
