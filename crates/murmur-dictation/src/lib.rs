//! Murmur Dictation crate - chord detection, session orchestration,
//! transcript cleanup, and X11 text delivery.
//!
//! The controller consumes chord transitions from the key-event loop,
//! drives recording sessions through the audio capture capability, and runs
//! each ended session through transcribe -> clean -> deliver on a detached
//! task.

pub mod chord;
pub mod cleaner;
pub mod controller;
#[cfg(target_os = "linux")]
pub mod keyboard;
pub mod output;

pub use chord::{Chord, ChordDetector, ChordTransition};
pub use cleaner::clean_transcript;
pub use controller::{DictationController, PRIMING_PROMPT};
pub use output::{FocusProbe, OutputSink, WindowId, X11Desktop};
