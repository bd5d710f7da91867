//! Dictation orchestration: chord transitions drive the session lifecycle.
//!
//! The controller has two states, Idle and Recording, where Recording means
//! "the session cell holds an open [`RecordingSession`]". On chord release
//! the cell is emptied immediately - a new hold can start recording right
//! away - and the ended session is moved into a detached task that seals,
//! transcribes, cleans and delivers. Each session owns its own frame buffer,
//! so a recording starting while an earlier transcription is still running
//! cannot touch the earlier session's audio.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use murmur_audio::{AudioCapture, RecordingSession};
use murmur_whisper::{TranscribeOptions, Transcriber};

use crate::chord::ChordTransition;
use crate::cleaner::clean_transcript;
use crate::output::{FocusProbe, OutputSink, WindowId};

/// Example text given to the transcriber to bias it toward natural
/// punctuation.
pub const PRIMING_PROMPT: &str = "Hello, how are you? I'm doing well. Let's discuss the project.";

/// One in-flight recording plus the window focused when it started.
struct ActiveSession {
    recording: RecordingSession,
    window: Option<WindowId>,
}

/// Orchestrates press-to-release dictation sessions.
pub struct DictationController<C, T, F, S> {
    capture: Arc<C>,
    transcriber: Arc<T>,
    focus: F,
    sink: Arc<S>,
    /// Language hint forwarded to the transcriber; `None` = auto-detect.
    language: Option<String>,
    /// The currently open session, if any. This cell is the only state
    /// shared between the key-event context and the rest of the pipeline;
    /// it is locked only for brief mutations, never across transcription.
    active: Mutex<Option<ActiveSession>>,
}

impl<C, T, F, S> DictationController<C, T, F, S>
where
    C: AudioCapture,
    T: Transcriber + 'static,
    F: FocusProbe,
    S: OutputSink + 'static,
{
    pub fn new(
        capture: Arc<C>,
        transcriber: Arc<T>,
        focus: F,
        sink: Arc<S>,
        language: Option<String>,
    ) -> Self {
        Self {
            capture,
            transcriber,
            focus,
            sink,
            language,
            active: Mutex::new(None),
        }
    }

    /// Whether a recording session is currently open.
    pub fn is_recording(&self) -> bool {
        self.active.lock().expect("session mutex poisoned").is_some()
    }

    /// Handle one chord transition from the key-event context.
    ///
    /// `Engaged` opens a session; `Released` seals the open session and
    /// hands the tail work to a detached task, returning immediately.
    /// Spurious duplicate transitions are no-ops.
    pub async fn on_transition(&self, transition: ChordTransition) {
        match transition {
            ChordTransition::Engaged => self.start_session().await,
            ChordTransition::Released => self.stop_session(),
        }
    }

    async fn start_session(&self) {
        if self.is_recording() {
            debug!("Chord engaged while already recording - ignored");
            return;
        }

        // Capture the focus target before opening the stream, so the text
        // lands in the window the user was dictating into.
        let window = self.focus.focused_window().await;

        let recording = match self.capture.open().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to open audio capture");
                return;
            }
        };

        info!(session_id = %recording.id(), window = ?window, "Recording - speak now");

        let mut active = self.active.lock().expect("session mutex poisoned");
        *active = Some(ActiveSession { recording, window });
    }

    fn stop_session(&self) {
        let taken = self.active.lock().expect("session mutex poisoned").take();
        let Some(session) = taken else {
            debug!("Chord released while idle - ignored");
            return;
        };

        // The controller is Idle again from here on; the ended session is
        // owned by the worker task and the key-event context never waits
        // on transcription.
        info!(
            session_id = %session.recording.id(),
            elapsed_secs = session.recording.elapsed_secs(),
            "Recording stopped"
        );

        let transcriber = Arc::clone(&self.transcriber);
        let sink = Arc::clone(&self.sink);
        let language = self.language.clone();
        tokio::spawn(async move {
            run_pipeline(session, transcriber, sink, language).await;
        });
    }
}

/// Seal, transcribe, clean and deliver one ended session.
///
/// Runs on its own task, concurrently with any newer session. Every failure
/// is handled here; nothing propagates back to the key-event context.
async fn run_pipeline<T, S>(
    session: ActiveSession,
    transcriber: Arc<T>,
    sink: Arc<S>,
    language: Option<String>,
) where
    T: Transcriber,
    S: OutputSink,
{
    let ActiveSession { recording, window } = session;
    let session_id = recording.id();

    let Some(clip) = recording.seal() else {
        info!(%session_id, "No audio captured");
        return;
    };

    info!(
        %session_id,
        duration_secs = clip.duration_secs(),
        "Transcribing audio"
    );

    let opts = TranscribeOptions {
        language,
        initial_prompt: Some(PRIMING_PROMPT.to_string()),
    };

    let segments = match transcriber
        .transcribe(&clip.samples, clip.sample_rate, &opts)
        .await
    {
        Ok(segments) => segments,
        Err(e) => {
            warn!(%session_id, error = %e, "Transcription failed");
            return;
        }
    };

    let raw = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let raw = raw.trim();
    if raw.is_empty() {
        info!(%session_id, "No speech detected");
        return;
    }

    let text = clean_transcript(raw);
    if text.is_empty() {
        info!(%session_id, "No speech detected");
        return;
    }

    info!(%session_id, text = %text, "Transcription result");

    if let Err(e) = sink.deliver(&text, window.as_ref()).await {
        warn!(%session_id, error = %e, "Failed to deliver text");
    }
}

// =============================================================================
// Tests
// =============================================================================
