//! Murmur Whisper crate - speech-to-text capability.
//!
//! Provides the [`Transcriber`] trait consumed by the dictation pipeline,
//! per-call [`TranscribeOptions`] (language hint and priming prompt), the
//! whisper.cpp-backed service, and a mock implementation for testing without
//! loading a real model.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;

use murmur_core::error::{MurmurError, Result};

pub mod whisper_service;

pub use whisper_service::WhisperService;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Whisper transcription engine.
///
/// The device and compute knobs are passed through to the backend and
/// validated there, not here.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Model size: "tiny", "base", "small", "medium", "large-v3".
    pub model: String,
    /// Directory holding GGML model files.
    pub model_dir: String,
    /// Compute device: "cuda" or "cpu".
    pub device: String,
    /// Numeric precision mode, e.g. "float16".
    pub compute: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            model_dir: "~/.murmur/models".to_string(),
            device: "cuda".to_string(),
            compute: "float16".to_string(),
        }
    }
}

impl WhisperConfig {
    /// Path of the GGML file for the configured model size, with `~`
    /// expanded to the home directory.
    pub fn model_path(&self) -> PathBuf {
        let dir = if let Some(rest) = self.model_dir.strip_prefix("~/") {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        } else {
            PathBuf::from(&self.model_dir)
        };
        dir.join(format!("ggml-{}.bin", self.model))
    }
}

// =============================================================================
// Request / result types
// =============================================================================

/// Per-call transcription options.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// Language hint. `None` lets the model auto-detect.
    pub language: Option<String>,
    /// Example text biasing the model's punctuation and formatting style.
    pub initial_prompt: Option<String>,
}

/// A single time-aligned segment of transcribed speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start time in seconds from the beginning of the audio.
    pub start: f32,
    /// End time in seconds from the beginning of the audio.
    pub end: f32,
    /// Transcribed text for this segment.
    pub text: String,
}

// =============================================================================
// Trait
// =============================================================================

/// Capability for transcribing audio samples to text segments.
///
/// Callers are responsible for joining segment texts; implementations return
/// them in utterance order.
pub trait Transcriber: Send + Sync {
    /// Transcribe PCM f32 samples in [-1.0, 1.0] at the given sample rate.
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> impl Future<Output = Result<Vec<Segment>>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// One recorded call against [`MockTranscriber`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub sample_count: usize,
    pub sample_rate: u32,
    pub language: Option<String>,
    pub initial_prompt: Option<String>,
}

/// Mock transcription service returning canned segments.
///
/// Records every call so tests can assert on what the pipeline sent.
#[derive(Debug, Default)]
pub struct MockTranscriber {
    segments: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
    fail: bool,
}

impl MockTranscriber {
    /// A mock returning the given segment texts on every call.
    pub fn returning(texts: &[&str]) -> Self {
        Self {
            segments: texts.iter().map(|t| t.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A mock returning no segments (no speech detected).
    pub fn silent() -> Self {
        Self::returning(&[])
    }

    /// A mock whose `transcribe` always fails.
    pub fn failing() -> Self {
        Self {
            segments: Vec::new(),
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }
}

impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<Vec<Segment>> {
        self.calls.lock().expect("call mutex poisoned").push(RecordedCall {
            sample_count: samples.len(),
            sample_rate,
            language: opts.language.clone(),
            initial_prompt: opts.initial_prompt.clone(),
        });

        if self.fail {
            return Err(MurmurError::Transcription("mock failure".to_string()));
        }

        let duration = samples.len() as f32 / sample_rate.max(1) as f32;
        Ok(self
            .segments
            .iter()
            .enumerate()
            .map(|(i, text)| Segment {
                start: duration * i as f32 / self.segments.len().max(1) as f32,
                end: duration * (i + 1) as f32 / self.segments.len().max(1) as f32,
                text: text.clone(),
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_canned_segments() {
        let mock = MockTranscriber::returning(&["hello", "world"]);
        let audio = vec![0.0f32; 16_000];
        let segments = mock
            .transcribe(&audio, 16_000, &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello");
        assert_eq!(segments[1].text, "world");
        assert!(segments[0].end <= segments[1].start + f32::EPSILON);
    }

    #[tokio::test]
    async fn test_mock_silent_returns_no_segments() {
        let mock = MockTranscriber::silent();
        let segments = mock
            .transcribe(&[0.1f32; 100], 16_000, &TranscribeOptions::default())
            .await
            .unwrap();
        assert!(segments.is_empty());
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockTranscriber::failing();
        let result = mock
            .transcribe(&[0.1f32; 100], 16_000, &TranscribeOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockTranscriber::returning(&["hi"]);
        let opts = TranscribeOptions {
            language: Some("en".to_string()),
            initial_prompt: Some("Hello, how are you?".to_string()),
        };
        mock.transcribe(&[0.5f32; 320], 16_000, &opts).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sample_count, 320);
        assert_eq!(calls[0].sample_rate, 16_000);
        assert_eq!(calls[0].language.as_deref(), Some("en"));
        assert_eq!(calls[0].initial_prompt.as_deref(), Some("Hello, how are you?"));
    }

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model, "base");
        assert_eq!(config.device, "cuda");
        assert_eq!(config.compute, "float16");
    }

    #[test]
    fn test_model_path_resolution() {
        let config = WhisperConfig {
            model: "small".to_string(),
            model_dir: "/opt/models".to_string(),
            ..WhisperConfig::default()
        };
        assert_eq!(
            config.model_path(),
            PathBuf::from("/opt/models/ggml-small.bin")
        );
    }

    #[test]
    fn test_model_path_expands_home() {
        let config = WhisperConfig::default();
        let path = config.model_path();
        assert!(!path.to_string_lossy().starts_with("~"));
        assert!(path.to_string_lossy().ends_with(".murmur/models/ggml-base.bin"));
    }
}
