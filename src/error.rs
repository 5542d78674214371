//! Error types for ImpactSonic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImpactSonicError {
    /// A manifest entry is missing its name or source, or repeats a name.
    #[error("Invalid asset descriptor at index {index}: {reason}")]
    InvalidAssetDescriptor { index: usize, reason: String },

    /// Loading one asset failed; the whole load is abandoned.
    #[error("Failed to load asset '{name}': {reason}")]
    AssetLoad { name: String, reason: String },

    /// A body's fixed `audio` names an asset that was never loaded.
    #[error("Unknown asset reference: {0}")]
    UnknownAssetReference(String),

    /// An `alternate_audios` entry names an asset that was never loaded.
    #[error("Alternate audio '{name}' (index {index}) is not a loaded asset")]
    MissingAlternateAsset { name: String, index: usize },

    /// A collision pair names a missing body, or the same body twice.
    #[error("Invalid collision pair: {0}")]
    InvalidCollisionPair(String),

    /// The mixer has not drained earlier start commands; this one was dropped.
    #[error("Playback queue full, dropped instance of '{0}'")]
    PlaybackQueueFull(String),

    /// A dynamic resolver failed or panicked.
    #[error("Resolver for {body} failed: {reason}")]
    Resolver { body: String, reason: String },

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ImpactSonicError {
    /// Errors that abort startup. Everything else is reported per collision
    /// and never interrupts the simulation step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidAssetDescriptor { .. }
                | Self::AssetLoad { .. }
                | Self::AudioDevice(_)
                | Self::Configuration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ImpactSonicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImpactSonicError::AssetLoad {
            name: "kick".to_string(),
            reason: "file not found".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load asset 'kick': file not found");

        let err = ImpactSonicError::MissingAlternateAsset {
            name: "snare".to_string(),
            index: 2,
        };
        assert_eq!(
            err.to_string(),
            "Alternate audio 'snare' (index 2) is not a loaded asset"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(
            ImpactSonicError::InvalidAssetDescriptor {
                index: 0,
                reason: "missing name".into()
            }
            .is_fatal()
        );
        assert!(!ImpactSonicError::UnknownAssetReference("kick".into()).is_fatal());
        assert!(
            !ImpactSonicError::MissingAlternateAsset {
                name: "a".into(),
                index: 0
            }
            .is_fatal()
        );
    }
}
