use crate::error::{ImpactSonicError, Result};
use rubato::{FftFixedIn, Resampler};

/// Offline resampler used once per asset, right after decoding.
pub struct AudioResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(ImpactSonicError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(ImpactSonicError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024),
        })
    }

    /// Resamples interleaved samples, returning interleaved samples.
    ///
    /// The output is trimmed to `ceil(frames * target / source)` frames so the
    /// zero padding of the final chunk never reaches playback.
    pub fn resample_interleaved(&self, interleaved: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate || interleaved.is_empty() {
            return Ok(interleaved.to_vec());
        }

        let channels = self.channels as usize;
        let frames = interleaved.len() / channels;

        let planar: Vec<Vec<f32>> = (0..channels)
            .map(|ch| {
                interleaved
                    .chunks_exact(channels)
                    .map(|frame| frame[ch])
                    .collect()
            })
            .collect();

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2, // sub_chunks
            channels,
        )
        .map_err(|e| ImpactSonicError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];
        let mut position = 0;

        while position < frames {
            let chunk_in = resampler.input_frames_next();
            let available = (frames - position).min(chunk_in);

            let chunk: Vec<Vec<f32>> = planar
                .iter()
                .map(|channel| {
                    let mut padded = vec![0.0f32; chunk_in];
                    padded[..available].copy_from_slice(&channel[position..position + available]);
                    padded
                })
                .collect();

            let waves_out = resampler
                .process(&chunk, None)
                .map_err(|e| ImpactSonicError::AudioLoading(format!("Resampling error: {}", e)))?;

            for (out, wave) in output.iter_mut().zip(waves_out) {
                out.extend_from_slice(&wave);
            }

            position += available;
        }

        let expected_frames = self.expected_output_frames(frames);
        let produced_frames = output[0].len().min(expected_frames);

        let mut result = Vec::with_capacity(produced_frames * channels);
        for frame_idx in 0..produced_frames {
            for channel in &output {
                result.push(channel[frame_idx]);
            }
        }

        Ok(result)
    }

    pub fn expected_output_frames(&self, input_frames: usize) -> usize {
        let numerator = input_frames as u64 * self.target_sample_rate as u64;
        numerator.div_ceil(self.source_sample_rate as u64) as usize
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }
}
