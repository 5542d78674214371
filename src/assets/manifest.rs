use crate::audio_data::ImpactSonicAudioData;
use crate::error::{ImpactSonicError, Result};
use std::collections::HashSet;

/// One `{name, src}` pair of an asset manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub name: String,
    pub src: String,
}

impl AssetEntry {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
        }
    }
}

/// Ordered list of named audio sources to preload.
///
/// ```
/// # use impactsonic::assets::AssetManifest;
/// let manifest = AssetManifest::new()
///     .with("kick", "sounds/kick.wav")
///     .with("snare", "sounds/snare.wav");
/// assert_eq!(manifest.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    entries: Vec<AssetEntry>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AssetEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, src: impl Into<String>) -> Self {
        self.entries.push(AssetEntry::new(name, src));
        self
    }

    pub fn push(&mut self, entry: AssetEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks every entry before anything is loaded.
    ///
    /// Names and sources must be non-empty and names unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ImpactSonicError::InvalidAssetDescriptor {
                    index,
                    reason: "missing name".to_string(),
                });
            }
            if entry.src.trim().is_empty() {
                return Err(ImpactSonicError::InvalidAssetDescriptor {
                    index,
                    reason: format!("asset '{}' has no source", entry.name),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ImpactSonicError::InvalidAssetDescriptor {
                    index,
                    reason: format!("duplicate asset name '{}'", entry.name),
                });
            }
        }

        Ok(())
    }
}

/// A manifest entry together with its decoded audio once loaded.
#[derive(Debug, Clone)]
pub struct AudioAssetDescriptor {
    name: String,
    source: String,
    asset: Option<ImpactSonicAudioData>,
}

impl AudioAssetDescriptor {
    pub(crate) fn pending(entry: &AssetEntry) -> Self {
        Self {
            name: entry.name.clone(),
            source: entry.src.clone(),
            asset: None,
        }
    }

    /// Builds an already loaded descriptor, e.g. for audio synthesised in code.
    pub fn loaded(
        name: impl Into<String>,
        source: impl Into<String>,
        asset: ImpactSonicAudioData,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            asset: Some(asset),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn asset(&self) -> Option<&ImpactSonicAudioData> {
        self.asset.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.asset.is_some()
    }

    pub(crate) fn set_asset(&mut self, asset: ImpactSonicAudioData) {
        self.asset = Some(asset);
    }
}
