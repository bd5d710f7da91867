//! Real Whisper transcription service via whisper-rs (whisper.cpp bindings).
//!
//! When compiled with the `whisper` feature, loads a GGML model file and runs
//! speech-to-text inference on raw PCM audio. Without the feature, provides a
//! stub that errors at transcription time.

use murmur_core::error::{MurmurError, Result};

use crate::{Segment, TranscribeOptions, Transcriber, WhisperConfig};

/// Whisper transcription service backed by whisper.cpp.
///
/// Holds a loaded model context reused across transcription calls.
pub struct WhisperService {
    #[cfg(feature = "whisper")]
    ctx: whisper_rs::WhisperContext,
    config: WhisperConfig,
}

impl WhisperService {
    /// Create a new `WhisperService` by loading the configured GGML model.
    ///
    /// # Errors
    /// Returns `MurmurError::Transcription` if the model file doesn't exist
    /// or fails to load.
    #[cfg(feature = "whisper")]
    pub fn new(config: WhisperConfig) -> Result<Self> {
        use whisper_rs::{WhisperContext, WhisperContextParameters};

        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(MurmurError::Transcription(format!(
                "Whisper model file not found: {}",
                model_path.display()
            )));
        }

        tracing::info!(
            model = %config.model,
            device = %config.device,
            compute = %config.compute,
            "Loading Whisper model"
        );

        let mut params = WhisperContextParameters::default();
        // whisper.cpp has no precision knob; the compute setting is carried
        // for operators and logged above. Device maps to GPU offload.
        params.use_gpu(config.device != "cpu");

        let path_str = model_path.to_string_lossy();
        let ctx = WhisperContext::new_with_params(&path_str, params).map_err(|e| {
            MurmurError::Transcription(format!("Failed to load Whisper model: {}", e))
        })?;

        tracing::info!("Whisper model loaded");
        Ok(Self { ctx, config })
    }

    /// Stub constructor when the `whisper` feature is disabled.
    #[cfg(not(feature = "whisper"))]
    pub fn new(config: WhisperConfig) -> Result<Self> {
        tracing::warn!("WhisperService created without `whisper` feature - transcription will fail");
        Ok(Self { config })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Real implementation (whisper feature enabled)
// ---------------------------------------------------------------------------

#[cfg(feature = "whisper")]
impl Transcriber for WhisperService {
    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<Vec<Segment>> {
        use whisper_rs::{FullParams, SamplingStrategy};

        if samples.is_empty() {
            return Err(MurmurError::Transcription(
                "Cannot transcribe empty audio data".into(),
            ));
        }

        if sample_rate == 0 {
            return Err(MurmurError::Transcription(
                "Sample rate must be greater than 0".into(),
            ));
        }

        // Whisper expects 16 kHz mono PCM. Resample if needed.
        let samples_16k = if sample_rate != 16_000 {
            resample(samples, sample_rate, 16_000)
        } else {
            samples.to_vec()
        };

        let duration_secs = samples_16k.len() as f32 / 16_000.0;
        tracing::debug!(
            samples = samples_16k.len(),
            duration_secs,
            "Starting Whisper transcription"
        );

        // Run inference (synchronous - whisper.cpp is CPU/GPU-bound).
        let mut state = self.ctx.create_state().map_err(|e| {
            MurmurError::Transcription(format!("Failed to create Whisper state: {}", e))
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(opts.language.as_deref());
        if let Some(ref prompt) = opts.initial_prompt {
            params.set_initial_prompt(prompt);
        }
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_single_segment(false);

        state
            .full(params, &samples_16k)
            .map_err(|e| MurmurError::Transcription(format!("Whisper inference failed: {}", e)))?;

        let n_segments = state.full_n_segments().map_err(|e| {
            MurmurError::Transcription(format!("Failed to get segment count: {}", e))
        })?;

        let mut segments = Vec::with_capacity(n_segments as usize);
        for i in 0..n_segments {
            let text = state.full_get_segment_text(i).map_err(|e| {
                MurmurError::Transcription(format!("Failed to get segment {} text: {}", i, e))
            })?;

            // Timestamps are in centiseconds (1/100 s).
            let t0 = state.full_get_segment_t0(i).map_err(|e| {
                MurmurError::Transcription(format!("Failed to get segment {} t0: {}", i, e))
            })?;
            let t1 = state.full_get_segment_t1(i).map_err(|e| {
                MurmurError::Transcription(format!("Failed to get segment {} t1: {}", i, e))
            })?;

            segments.push(Segment {
                start: t0 as f32 / 100.0,
                end: t1 as f32 / 100.0,
                text: text.trim().to_string(),
            });
        }

        tracing::info!(
            segments = segments.len(),
            duration_secs,
            "Transcription complete"
        );

        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// Stub implementation (whisper feature disabled)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperService {
    async fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        _opts: &TranscribeOptions,
    ) -> Result<Vec<Segment>> {
        Err(MurmurError::Transcription(
            "Whisper transcription requires the `whisper` feature to be enabled".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Resampling helper
// ---------------------------------------------------------------------------

/// Simple linear resampling from one sample rate to another.
#[cfg(feature = "whisper")]
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let idx1 = (idx0 + 1).min(input.len() - 1);
        let frac = (src_idx - idx0 as f64) as f32;
        output.push(input[idx0] * (1.0 - frac) + input[idx1] * frac);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
