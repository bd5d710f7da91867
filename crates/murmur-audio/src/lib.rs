//! Murmur Audio crate - recording-session lifecycle and microphone capture.
//!
//! A [`RecordingSession`] owns one press-to-release recording: the capture
//! stream keeping the microphone open, and the frame sequence the stream's
//! callback appends into. Sealing the session releases the stream and yields
//! the accumulated samples as one contiguous [`AudioClip`]. A trait-based
//! capture abstraction with a mock implementation allows testing without
//! real audio hardware.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use murmur_core::error::{MurmurError, Result};

pub mod capture;

pub use capture::{CaptureConfig, CpalCapture};

/// Sample rate every session records at, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Channel count every session records at (mono).
pub const CHANNELS: u16 = 1;

// =============================================================================
// Frame sink
// =============================================================================

/// Shared, append-only sequence of audio-frame chunks for one session.
///
/// The capture callback pushes copies of delivered chunks; the session drains
/// them exactly once at seal time. Every session allocates its own sink, so a
/// new recording can never write into a buffer a previous session's worker is
/// still reading.
#[derive(Debug, Clone, Default)]
pub struct FrameSink {
    chunks: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy of one delivered chunk, preserving arrival order.
    ///
    /// Called from the audio callback: must not block for long and must not
    /// panic, so a poisoned lock drops the chunk instead.
    pub fn push(&self, chunk: &[f32]) {
        if let Ok(mut chunks) = self.chunks.lock() {
            chunks.push(chunk.to_vec());
        }
    }

    /// Number of chunks accumulated so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn drain(&self) -> Vec<Vec<f32>> {
        self.chunks
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }
}

// =============================================================================
// Session types
// =============================================================================

/// Owning handle for an open capture stream. Dropping it stops capture and
/// releases the audio device.
pub trait StreamGuard: Send {}

/// One recording's accumulated samples, concatenated in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// One press-to-release recording: the open capture stream plus the frame
/// sequence its callback writes into.
///
/// Created when recording starts, sealed exactly once when it stops. The
/// stream is released on every exit path because the guard is owned here and
/// dropped either by [`RecordingSession::seal`] or by dropping the session.
pub struct RecordingSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    sample_rate: u32,
    channels: u16,
    frames: FrameSink,
    guard: Option<Box<dyn StreamGuard>>,
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("chunks", &self.frames.chunk_count())
            .field("has_stream", &self.guard.is_some())
            .finish()
    }
}

impl RecordingSession {
    /// Create a new session around a freshly opened stream.
    ///
    /// `guard` is `None` only for capture backends with no real stream to
    /// hold open (mocks).
    pub fn new(
        sample_rate: u32,
        channels: u16,
        frames: FrameSink,
        guard: Option<Box<dyn StreamGuard>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            sample_rate,
            channels,
            frames,
            guard,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Seconds elapsed since the session was opened.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }

    /// Stop capture and concatenate all accumulated chunks in arrival order.
    ///
    /// Returns `None` if no frames ever arrived, which is distinct from a
    /// clip of silent (zero-amplitude) samples; callers treat `None` as a
    /// no-op rather than an error.
    pub fn seal(mut self) -> Option<AudioClip> {
        // Release the stream first so the callback stops before we read.
        self.guard.take();

        let chunks = self.frames.drain();
        if chunks.is_empty() {
            return None;
        }

        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in &chunks {
            samples.extend_from_slice(chunk);
        }

        Some(AudioClip {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

// =============================================================================
// Capture trait
// =============================================================================

/// Capability for opening microphone capture streams.
///
/// Each call to `open` acquires the device and returns a session with a
/// fresh, independently owned frame sink.
pub trait AudioCapture: Send + Sync {
    fn open(&self) -> impl Future<Output = Result<RecordingSession>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock capture backend for testing without hardware.
///
/// Hands out sessions with no real stream and remembers each session's frame
/// sink so tests can feed chunks mid-session.
#[derive(Default)]
pub struct MockCapture {
    sinks: Mutex<Vec<FrameSink>>,
    fail: bool,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose `open` always fails.
    pub fn failing() -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// The frame sink handed to the `n`th opened session.
    pub fn sink(&self, n: usize) -> Option<FrameSink> {
        self.sinks.lock().expect("sink mutex poisoned").get(n).cloned()
    }

    /// How many sessions have been opened.
    pub fn session_count(&self) -> usize {
        self.sinks.lock().expect("sink mutex poisoned").len()
    }
}

impl AudioCapture for MockCapture {
    async fn open(&self) -> Result<RecordingSession> {
        if self.fail {
            return Err(MurmurError::Audio("mock capture failure".to_string()));
        }
        let frames = FrameSink::new();
        self.sinks
            .lock()
            .expect("sink mutex poisoned")
            .push(frames.clone());
        Ok(RecordingSession::new(SAMPLE_RATE, CHANNELS, frames, None))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sink_preserves_arrival_order() {
        let sink = FrameSink::new();
        sink.push(&[0.1, 0.2]);
        sink.push(&[0.3]);
        sink.push(&[0.4, 0.5]);

        assert_eq!(sink.chunk_count(), 3);
        let chunks = sink.drain();
        assert_eq!(chunks, vec![vec![0.1, 0.2], vec![0.3], vec![0.4, 0.5]]);
        assert_eq!(sink.chunk_count(), 0);
    }

    #[test]
    fn test_seal_with_no_frames_is_none() {
        let session = RecordingSession::new(SAMPLE_RATE, CHANNELS, FrameSink::new(), None);
        assert!(session.seal().is_none());
    }

    #[test]
    fn test_seal_with_silent_frames_is_not_none() {
        // Zero-amplitude audio is still audio; only zero *frames* is empty.
        let frames = FrameSink::new();
        frames.push(&[0.0; 160]);

        let session = RecordingSession::new(SAMPLE_RATE, CHANNELS, frames, None);
        let clip = session.seal().unwrap();
        assert_eq!(clip.samples.len(), 160);
        assert!(clip.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_seal_concatenates_in_order() {
        let frames = FrameSink::new();
        frames.push(&[0.1, 0.2]);
        frames.push(&[0.3]);
        frames.push(&[0.4, 0.5]);

        let session = RecordingSession::new(SAMPLE_RATE, CHANNELS, frames, None);
        let clip = session.seal().unwrap();
        assert_eq!(clip.samples, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(clip.sample_rate, SAMPLE_RATE);
        assert_eq!(clip.channels, CHANNELS);
    }

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip {
            samples: vec![0.0; 32_000],
            sample_rate: 16_000,
            channels: 1,
        };
        assert!((clip.duration_secs() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_session_elapsed_starts_near_zero() {
        let session = RecordingSession::new(SAMPLE_RATE, CHANNELS, FrameSink::new(), None);
        assert!(session.elapsed_secs() < 1.0);
    }

    struct DropFlag(Arc<Mutex<bool>>);

    impl StreamGuard for DropFlag {}

    impl Drop for DropFlag {
        fn drop(&mut self) {
            *self.0.lock().unwrap() = true;
        }
    }

    #[test]
    fn test_seal_releases_stream_guard() {
        let dropped = Arc::new(Mutex::new(false));
        let guard = DropFlag(Arc::clone(&dropped));

        let session =
            RecordingSession::new(SAMPLE_RATE, CHANNELS, FrameSink::new(), Some(Box::new(guard)));
        let _ = session.seal();
        assert!(*dropped.lock().unwrap());
    }

    #[test]
    fn test_dropping_session_releases_stream_guard() {
        let dropped = Arc::new(Mutex::new(false));
        let guard = DropFlag(Arc::clone(&dropped));

        let session =
            RecordingSession::new(SAMPLE_RATE, CHANNELS, FrameSink::new(), Some(Box::new(guard)));
        drop(session);
        assert!(*dropped.lock().unwrap());
    }

    #[tokio::test]
    async fn test_mock_capture_hands_out_fresh_sinks() {
        let capture = MockCapture::new();

        let first = capture.open().await.unwrap();
        capture.sink(0).unwrap().push(&[0.1, 0.1]);

        // Second session opens while the first is still alive; its frames
        // land in its own sink.
        let second = capture.open().await.unwrap();
        capture.sink(1).unwrap().push(&[0.9]);
        capture.sink(0).unwrap().push(&[0.2]);

        assert_eq!(capture.session_count(), 2);
        assert_ne!(first.id(), second.id());

        let first_clip = first.seal().unwrap();
        let second_clip = second.seal().unwrap();
        assert_eq!(first_clip.samples, vec![0.1, 0.1, 0.2]);
        assert_eq!(second_clip.samples, vec![0.9]);
    }

    #[tokio::test]
    async fn test_mock_capture_failing() {
        let capture = MockCapture::failing();
        let result = capture.open().await;
        assert!(result.is_err());
        assert_eq!(capture.session_count(), 0);
    }
}
