//! Microphone capture via cpal (ALSA/PulseAudio/PipeWire backends).
//!
//! Opens one input stream per recording session. The stream callback copies
//! each delivered chunk into the session's frame sink, downmixing and
//! resampling to 16 kHz mono when the device cannot deliver that natively.
//! Dropping the returned session's stream guard stops capture and releases
//! the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use murmur_core::error::{MurmurError, Result};

use crate::{AudioCapture, FrameSink, RecordingSession, StreamGuard, CHANNELS, SAMPLE_RATE};

/// Configuration for the cpal capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Name or substring of the input device. "default" selects the
    /// system default input device.
    pub device_name: String,
    /// Sample rate sessions are delivered at, in Hz.
    pub sample_rate: u32,
    /// Channel count sessions are delivered at (1 = mono).
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: "default".to_string(),
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
        }
    }
}

/// Wrapper to move `cpal::Stream` across threads.
///
/// `cpal::Stream` contains a raw-pointer marker that prevents auto
/// `Send`. The handle is only ever stored to keep the stream alive and
/// dropped to stop capture; all audio data flows through the callback on
/// cpal's own thread.
struct SendStream(#[allow(dead_code)] cpal::Stream);

// SAFETY: SendStream wraps a cpal::Stream which manages its own audio thread.
// 1. The Stream handle is never used to read or write audio data
// 2. Audio callbacks run on a separate OS thread managed by cpal
// 3. No mutable state is shared between the Stream handle and callbacks
unsafe impl Send for SendStream {}

impl StreamGuard for SendStream {}

/// cpal-backed capture: each `open` acquires an input stream feeding a fresh
/// [`FrameSink`].
pub struct CpalCapture {
    config: CaptureConfig,
}

impl CpalCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl AudioCapture for CpalCapture {
    async fn open(&self) -> Result<RecordingSession> {
        let host = cpal::default_host();

        let device = if self.config.device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| MurmurError::Audio("No default input device found".into()))?
        } else {
            let name_lower = self.config.device_name.to_lowercase();
            host.input_devices()
                .map_err(|e| MurmurError::Audio(format!("Failed to enumerate devices: {}", e)))?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&name_lower))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    MurmurError::Audio(format!(
                        "Audio device '{}' not found",
                        self.config.device_name
                    ))
                })?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        debug!(device = %device_name, "Selected audio device");

        // Query the device's preferred config instead of forcing our own.
        // Many devices don't support arbitrary sample rates / channel counts.
        let stream_config = match device.default_input_config() {
            Ok(supported) => cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            Err(e) => {
                debug!(error = %e, "Could not query default config, using requested config");
                cpal::StreamConfig {
                    channels: self.config.channels,
                    sample_rate: cpal::SampleRate(self.config.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                }
            }
        };

        let device_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels;
        let target_rate = self.config.sample_rate;
        let needs_conversion = device_rate != target_rate || device_channels != CHANNELS;

        let frames = FrameSink::new();
        let callback_frames = frames.clone();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !needs_conversion {
                        callback_frames.push(data);
                        return;
                    }
                    let mono = downmix_to_mono(data, device_channels);
                    let resampled = resample_linear(&mono, device_rate, target_rate);
                    callback_frames.push(&resampled);
                },
                move |err| {
                    // Transient driver errors are logged and dropped; the
                    // session keeps running.
                    warn!(error = %err, "Audio stream error");
                },
                None,
            )
            .map_err(|e| MurmurError::Audio(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| MurmurError::Audio(format!("Failed to start audio stream: {}", e)))?;

        let session = RecordingSession::new(
            target_rate,
            self.config.channels,
            frames,
            Some(Box::new(SendStream(stream))),
        );

        info!(
            session_id = %session.id(),
            device = %device_name,
            device_rate,
            device_channels,
            target_rate,
            "Audio capture started"
        );

        Ok(session)
    }
}

/// Average interleaved channels down to mono.
fn downmix_to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation resampling; sufficient for low-frequency speech.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (input.len() as f64 / ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src = i as f64 * ratio;
        let idx0 = src.floor() as usize;
        let idx1 = (idx0 + 1).min(input.len().saturating_sub(1));
        let frac = (src - idx0 as f64) as f32;
        out.push(input[idx0] * (1.0 - frac) + input[idx1] * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.device_name, "default");
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.channels, 1);
    }

    #[test]
    fn test_capture_creation() {
        let capture = CpalCapture::new(CaptureConfig {
            device_name: "USB Microphone".to_string(),
            sample_rate: 48_000,
            channels: 1,
        });
        assert_eq!(capture.config().device_name, "USB Microphone");
        assert_eq!(capture.config().sample_rate, 48_000);
    }

    #[test]
    fn test_stereo_to_mono_downmix() {
        // Interleaved stereo: [L0, R0, L1, R1, ...]
        let stereo = vec![0.4f32, 0.6, 0.2, 0.8, 1.0, 0.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.5).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
        assert!((mono[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mono_downmix_is_identity() {
        let mono = vec![0.1f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_linear_resample_3to1() {
        // 48 kHz -> 16 kHz is a 3:1 ratio.
        let input: Vec<f32> = (0..30).map(|i| i as f32).collect();
        let out = resample_linear(&input, 48_000, 16_000);
        assert_eq!(out.len(), 10);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 3.0).abs() < 1e-6);
        assert!((out[2] - 6.0).abs() < 1e-6);
        assert!((out[9] - 27.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.5f32, -0.5, 0.25];
        assert_eq!(resample_linear(&input, 16_000, 16_000), input);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_linear(&[], 48_000, 16_000).is_empty());
    }
}
