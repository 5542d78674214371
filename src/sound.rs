//! Per-body sound configuration.
//!
//! Every body carries its own [`SoundConfig`]. It says which loaded asset the
//! body sounds like on impact, or which callback decides that at runtime,
//! plus an optional rotation of alternate assets and the `self_only` flag.
//! The configuration is owned by exactly one body: the alternation cursor
//! (`current_audio_index`) is mutated in place on every trigger.

use crate::error::Result;
use crate::simulation::BodyId;
use std::fmt;
use std::sync::Arc;

/// Options handed to playback and to dynamic resolvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Playback volume in `[0, 1]`.
    pub volume: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

impl PlayOptions {
    pub fn with_volume(volume: f32) -> Self {
        Self { volume }
    }
}

/// Callback resolving a body's sound at collision time.
///
/// Receives `(body, other_body, options)`. It replaces the default lookup
/// entirely; whatever it plays (if anything) is its own business. An error
/// or a panic is reported for this body only and the rest of the
/// collision batch is still dispatched.
pub type AudioResolver =
    Arc<dyn Fn(&dyn SoundBody, &dyn SoundBody, &PlayOptions) -> Result<()> + Send + Sync>;

/// How a body sounds on collision.
#[derive(Clone)]
pub enum BodyAudio {
    /// Play the loaded asset with this name.
    FixedAsset(String),
    /// Call this resolver instead of looking up an asset.
    DynamicResolver(AudioResolver),
}

impl BodyAudio {
    pub fn fixed(name: impl Into<String>) -> Self {
        Self::FixedAsset(name.into())
    }

    pub fn resolver<F>(resolver: F) -> Self
    where
        F: Fn(&dyn SoundBody, &dyn SoundBody, &PlayOptions) -> Result<()> + Send + Sync + 'static,
    {
        Self::DynamicResolver(Arc::new(resolver))
    }

    pub fn asset_name(&self) -> Option<&str> {
        match self {
            Self::FixedAsset(name) => Some(name),
            Self::DynamicResolver(_) => None,
        }
    }
}

impl fmt::Debug for BodyAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedAsset(name) => f.debug_tuple("FixedAsset").field(name).finish(),
            Self::DynamicResolver(_) => f.write_str("DynamicResolver(..)"),
        }
    }
}

/// Sound configuration attached to a body.
///
/// Every field is optional so that a partial configuration set by the
/// body's creator can be layered over plugin defaults; see
/// [`SoundConfig::layered_over`].
#[derive(Debug, Clone, Default)]
pub struct SoundConfig {
    /// Fixed asset or dynamic resolver; `None` is silent.
    pub audio: Option<BodyAudio>,
    /// Asset names cycled through on successive triggers.
    pub alternate_audios: Option<Vec<String>>,
    /// Last used index into `alternate_audios`.
    pub current_audio_index: Option<usize>,
    /// When set, this body is the only one that sounds in a pair collision.
    pub self_only: Option<bool>,
}

impl SoundConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audio(mut self, audio: BodyAudio) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn fixed_asset(self, name: impl Into<String>) -> Self {
        self.audio(BodyAudio::fixed(name))
    }

    pub fn resolver<F>(self, resolver: F) -> Self
    where
        F: Fn(&dyn SoundBody, &dyn SoundBody, &PlayOptions) -> Result<()> + Send + Sync + 'static,
    {
        self.audio(BodyAudio::resolver(resolver))
    }

    pub fn alternate_audios<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_audios = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn self_only(mut self, self_only: bool) -> Self {
        self.self_only = Some(self_only);
        self
    }

    pub fn is_self_only(&self) -> bool {
        self.self_only.unwrap_or(false)
    }

    /// Shallow merge: every field present on `self` wins, missing fields
    /// fall back to `defaults`.
    pub fn layered_over(self, defaults: &SoundConfig) -> SoundConfig {
        SoundConfig {
            audio: self.audio.or_else(|| defaults.audio.clone()),
            alternate_audios: self
                .alternate_audios
                .or_else(|| defaults.alternate_audios.clone()),
            current_audio_index: self.current_audio_index.or(defaults.current_audio_index),
            self_only: self.self_only.or(defaults.self_only),
        }
    }

    /// The alternation entry the next trigger should play, if alternation
    /// is configured: entry 0 when no index is recorded yet, otherwise the
    /// entry after the current one, wrapping to 0 at the end.
    pub fn next_alternate_index(&self) -> Option<usize> {
        let len = self.alternate_audios.as_ref().map_or(0, Vec::len);
        if len == 0 {
            return None;
        }

        Some(match self.current_audio_index {
            None => 0,
            Some(current) if current + 1 < len => current + 1,
            Some(_) => 0,
        })
    }

    pub(crate) fn alternate_at(&self, index: usize) -> Option<&str> {
        self.alternate_audios
            .as_ref()
            .and_then(|names| names.get(index))
            .map(String::as_str)
    }
}

/// A simulation body that can carry sound configuration.
///
/// Implemented by the host's body type; [`crate::simulation::Body`] is the
/// in-crate implementation.
pub trait SoundBody {
    fn body_id(&self) -> BodyId;

    /// Human readable name used in log messages.
    fn label(&self) -> &str {
        ""
    }

    fn sound(&self) -> Option<&SoundConfig>;

    fn sound_mut(&mut self) -> &mut Option<SoundConfig>;
}
