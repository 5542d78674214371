use crate::audio_data::{ConvertToMono, ImpactSonicAudioData, LoadOptions};
use crate::error::Result;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Completion signals a loader may report for one asset.
#[derive(Debug)]
pub enum LoadSignal {
    /// Fetching or decoding failed.
    Error(String),
    /// Enough data is available to play the asset through.
    CanPlayThrough(ImpactSonicAudioData),
    /// The first frame of data is available.
    LoadedData(ImpactSonicAudioData),
}

impl LoadSignal {
    fn kind(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::CanPlayThrough(_) => "canplaythrough",
            Self::LoadedData(_) => "loadeddata",
        }
    }
}

/// Outcome of one asset, forwarded to the [`AssetLoadHandle`](super::AssetLoadHandle).
#[derive(Debug)]
pub(crate) struct LoadOutcome {
    pub index: usize,
    pub result: std::result::Result<ImpactSonicAudioData, String>,
}

struct SignalState {
    index: usize,
    name: String,
    options: LoadOptions,
    settled: AtomicBool,
    outcome: Sender<LoadOutcome>,
}

impl SignalState {
    /// Settles the asset with `signal` unless an earlier signal already did.
    fn settle(&self, signal: LoadSignal) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            log::trace!(
                "Ignoring late '{}' signal for asset '{}'",
                signal.kind(),
                self.name
            );
            return false;
        }

        log::debug!("Asset '{}' settled by '{}'", self.name, signal.kind());

        let result = match signal {
            LoadSignal::Error(reason) => Err(reason),
            LoadSignal::CanPlayThrough(data) | LoadSignal::LoadedData(data) => {
                prepare(data, &self.options).map_err(|e| e.to_string())
            }
        };

        // The handle may already be gone (abandoned load); nobody is listening then.
        let _ = self.outcome.send(LoadOutcome {
            index: self.index,
            result,
        });
        true
    }
}

impl Drop for SignalState {
    fn drop(&mut self) {
        if !self.settled.load(Ordering::Acquire) {
            self.settle(LoadSignal::Error(
                "loader finished without reporting a result".to_string(),
            ));
        }
    }
}

/// Applies the channel and sample rate conversions requested in `options`.
fn prepare(data: ImpactSonicAudioData, options: &LoadOptions) -> Result<ImpactSonicAudioData> {
    let data = match options.convert_to_mono {
        ConvertToMono::Original => data,
        ConvertToMono::ForceMono => data.to_mono()?,
    };

    match options.target_sample_rate {
        Some(rate) if rate != data.sample_rate() => data.resample(rate),
        _ => Ok(data),
    }
}

/// Reports the outcome of loading a single asset.
///
/// The first signal sent through any clone settles the asset; every later
/// one is ignored and returns `false`. Dropping the last clone without
/// sending anything fails the asset.
#[derive(Clone)]
pub struct LoadSignalSender {
    state: Arc<SignalState>,
}

impl LoadSignalSender {
    pub(crate) fn new(
        index: usize,
        name: &str,
        options: LoadOptions,
        outcome: Sender<LoadOutcome>,
    ) -> Self {
        Self {
            state: Arc::new(SignalState {
                index,
                name: name.to_string(),
                options,
                settled: AtomicBool::new(false),
                outcome,
            }),
        }
    }

    /// Sends `signal`; returns whether it settled the asset.
    pub fn send(&self, signal: LoadSignal) -> bool {
        self.state.settle(signal)
    }

    pub fn error(&self, reason: impl Into<String>) -> bool {
        self.send(LoadSignal::Error(reason.into()))
    }

    pub fn can_play_through(&self, data: ImpactSonicAudioData) -> bool {
        self.send(LoadSignal::CanPlayThrough(data))
    }

    pub fn loaded_data(&self, data: ImpactSonicAudioData) -> bool {
        self.send(LoadSignal::LoadedData(data))
    }

    pub fn is_settled(&self) -> bool {
        self.state.settled.load(Ordering::Acquire)
    }

    pub fn asset_name(&self) -> &str {
        &self.state.name
    }
}
