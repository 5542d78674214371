use crate::{
    assets::LoadSignalSender,
    audio_data::{AudioDataLoader, ImpactSonicAudioData, LoadOptions},
    error::{ImpactSonicError, Result},
};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Default loader: decodes local files (plain paths or `file://` URIs) with
/// Symphonia into f32 PCM.
///
/// The file is decoded completely before anything is reported, so this
/// loader only ever sends "can play through" or an error.
///
/// ```ignore
/// use impactsonic::audio_data::DefaultAudioLoader;
///
/// let data = DefaultAudioLoader.decode("sounds/kick.wav", &LoadOptions::default())?;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAudioLoader;

impl AudioDataLoader for DefaultAudioLoader {
    fn load(&self, source: &str, options: &LoadOptions, signals: LoadSignalSender) {
        match self.decode(source, options) {
            Ok(data) => {
                signals.can_play_through(data);
            }
            Err(e) => {
                signals.error(e.to_string());
            }
        }
    }
}

impl DefaultAudioLoader {
    /// Decodes `source` synchronously.
    pub fn decode(&self, source: &str, options: &LoadOptions) -> Result<ImpactSonicAudioData> {
        let path = source.strip_prefix("file://").unwrap_or(source);
        let file = File::open(path)?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                ImpactSonicError::AudioLoading(format!("Failed to probe audio format: {:?}", e))
            })?;

        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            ImpactSonicError::AudioLoading("No default audio track found".to_string())
        })?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| ImpactSonicError::AudioLoading("Sample rate not found".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| ImpactSonicError::AudioLoading("Channel count not found".to_string()))?
            .count() as u16;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                ImpactSonicError::AudioLoading(format!("Failed to create decoder: {:?}", e))
            })?;

        let max_frames = options
            .max_duration
            .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
            .unwrap_or(usize::MAX);

        let mut samples: Vec<f32> = Vec::new();
        let mut frames_decoded = 0;

        while frames_decoded < max_frames {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break, // end-of-file
                Err(e) => {
                    return Err(ImpactSonicError::AudioLoading(format!(
                        "Error reading packet: {:?}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break,
                Err(Error::DecodeError(e)) => {
                    log::debug!("Skipping corrupt packet in {}: {}", source, e);
                    continue;
                }
                Err(e) => {
                    return Err(ImpactSonicError::AudioLoading(format!(
                        "Error decoding packet: {:?}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            let frames = buffer.samples().len() / channels as usize;
            let take = frames.min(max_frames - frames_decoded);
            samples.extend_from_slice(&buffer.samples()[..take * channels as usize]);
            frames_decoded += take;
        }

        if samples.is_empty() {
            return Err(ImpactSonicError::AudioLoading(format!(
                "No audio frames decoded from {}",
                source
            )));
        }

        log::debug!(
            "Decoded {}: {} frames, {} Hz, {} channel(s)",
            source,
            frames_decoded,
            sample_rate,
            channels
        );

        ImpactSonicAudioData::from_samples(samples, sample_rate, channels)
    }
}
