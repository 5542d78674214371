use crate::assets::LoadSignalSender;
use crate::audio_data::LoadOptions;

/// Trait for turning an asset source into playable audio data.
///
/// A loader reports progress through the [`LoadSignalSender`] it is handed.
/// Whichever signal arrives first settles the asset: an error, "enough data
/// to play through", or "first frame of data". Signals sent after that are
/// dropped, so a loader may report as many as it likes.
///
/// `load` runs on a dedicated loading thread and is free to block.
///
/// # Example
///
/// ```ignore
/// use impactsonic::assets::LoadSignalSender;
/// use impactsonic::audio_data::{AudioDataLoader, LoadOptions};
///
/// struct SilenceLoader;
///
/// impl AudioDataLoader for SilenceLoader {
///     fn load(&self, source: &str, options: &LoadOptions, signals: LoadSignalSender) {
///         let data = make_silence(source, options);
///         signals.loaded_data(data);
///     }
/// }
/// ```
pub trait AudioDataLoader {
    /// Loads `source` and reports the outcome through `signals`.
    ///
    /// Returning without sending any signal counts as a failed load.
    fn load(&self, source: &str, options: &LoadOptions, signals: LoadSignalSender);
}
