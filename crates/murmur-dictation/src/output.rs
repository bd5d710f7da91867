//! Window-focus discovery and paste-based text delivery on X11.
//!
//! Delivery places the text on the clipboard via `xclip`, refocuses the
//! window captured at recording start via `xdotool`, and issues a paste
//! keystroke - `ctrl+shift+v` for terminal-class windows (which reserve the
//! default paste shortcut for themselves), `ctrl+v` for everything else.
//! Everything here is best-effort external-tool invocation: failures are
//! logged by the caller and never take the daemon down.

use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::sync::Mutex;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use murmur_core::error::{MurmurError, Result};

/// Identity of an X11 window as reported by `xdotool getactivewindow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WM_CLASS names of known terminal emulators.
pub const TERMINAL_CLASSES: &[&str] = &[
    "gnome-terminal",
    "gnome-terminal-server",
    "kitty",
    "alacritty",
    "konsole",
    "xterm",
    "urxvt",
    "st-256color",
    "terminator",
    "tilix",
    "xfce4-terminal",
    "mate-terminal",
    "foot",
];

// =============================================================================
// Traits
// =============================================================================

/// Capability for discovering which window currently has input focus.
pub trait FocusProbe: Send + Sync {
    /// The focused window, or `None` if it cannot be determined.
    fn focused_window(&self) -> impl Future<Output = Option<WindowId>> + Send;
}

/// Capability for delivering text to the focused application.
pub trait OutputSink: Send + Sync {
    /// Deliver `text` to `window` (or to whatever has focus when `None`).
    fn deliver(
        &self,
        text: &str,
        window: Option<&WindowId>,
    ) -> impl Future<Output = Result<()>> + Send;
}

// =============================================================================
// X11 implementation
// =============================================================================

/// X11 desktop adapter implementing both [`FocusProbe`] and [`OutputSink`]
/// via `xdotool`, `xclip` and `xprop`.
#[derive(Debug, Clone, Copy, Default)]
pub struct X11Desktop;

impl X11Desktop {
    pub fn new() -> Self {
        Self
    }
}

impl FocusProbe for X11Desktop {
    async fn focused_window(&self) -> Option<WindowId> {
        match Command::new("xdotool").arg("getactivewindow").output().await {
            Ok(out) if out.status.success() => {
                let id = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if id.is_empty() {
                    None
                } else {
                    Some(WindowId(id))
                }
            }
            Ok(out) => {
                debug!(status = ?out.status, "xdotool getactivewindow failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "xdotool unavailable");
                None
            }
        }
    }
}

impl OutputSink for X11Desktop {
    async fn deliver(&self, text: &str, window: Option<&WindowId>) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        // Trailing space so consecutive utterances don't run together.
        set_clipboard(&format!("{} ", text)).await?;

        if let Some(id) = window {
            // Refocus is best-effort; the paste still goes to whatever ends
            // up focused.
            let refocus = Command::new("xdotool")
                .args(["windowfocus", "--sync", id.as_str()])
                .status()
                .await;
            match refocus {
                Ok(status) if status.success() => {}
                Ok(status) => warn!(window = %id, ?status, "Window refocus failed"),
                Err(e) => warn!(window = %id, error = %e, "Window refocus failed"),
            }
        }

        let paste_key = if is_terminal(window).await {
            "ctrl+shift+v"
        } else {
            "ctrl+v"
        };

        let status = Command::new("xdotool")
            .args(["key", "--clearmodifiers", paste_key])
            .status()
            .await
            .map_err(|e| MurmurError::Output(format!("Failed to run xdotool: {}", e)))?;

        if !status.success() {
            return Err(MurmurError::Output(format!(
                "xdotool key exited with {}",
                status
            )));
        }

        debug!(chars = text.len(), paste_key, "Text delivered");
        Ok(())
    }
}

async fn set_clipboard(text: &str) -> Result<()> {
    let mut child = Command::new("xclip")
        .args(["-selection", "clipboard"])
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| MurmurError::Output(format!("Failed to run xclip: {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| MurmurError::Output(format!("Failed to write clipboard: {}", e)))?;
    }

    let status = child
        .wait()
        .await
        .map_err(|e| MurmurError::Output(format!("xclip did not exit cleanly: {}", e)))?;

    if !status.success() {
        return Err(MurmurError::Output(format!(
            "xclip exited with {}",
            status
        )));
    }
    Ok(())
}

/// Whether the window belongs to a known terminal emulator.
async fn is_terminal(window: Option<&WindowId>) -> bool {
    let Some(id) = window else {
        return false;
    };

    match Command::new("xprop")
        .args(["-id", id.as_str(), "WM_CLASS"])
        .output()
        .await
    {
        Ok(out) if out.status.success() => {
            let wm_class = String::from_utf8_lossy(&out.stdout).to_lowercase();
            TERMINAL_CLASSES.iter().any(|c| wm_class.contains(c))
        }
        _ => false,
    }
}

// =============================================================================
// Mock implementations
// =============================================================================

/// Mock focus probe returning a fixed window identity.
#[derive(Debug, Clone, Default)]
pub struct MockFocusProbe {
    window: Option<WindowId>,
}

impl MockFocusProbe {
    /// A probe that always reports the given window as focused.
    pub fn fixed(id: impl Into<String>) -> Self {
        Self {
            window: Some(WindowId::new(id)),
        }
    }

    /// A probe that never finds a focused window.
    pub fn none() -> Self {
        Self { window: None }
    }
}

impl FocusProbe for MockFocusProbe {
    async fn focused_window(&self) -> Option<WindowId> {
        self.window.clone()
    }
}

/// Mock output sink recording every delivery.
#[derive(Debug, Default)]
pub struct MockSink {
    deliveries: Mutex<Vec<(String, Option<WindowId>)>>,
    fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `deliver` always fails.
    pub fn failing() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Deliveries made so far, in order.
    pub fn deliveries(&self) -> Vec<(String, Option<WindowId>)> {
        self.deliveries.lock().expect("delivery mutex poisoned").clone()
    }
}

impl OutputSink for MockSink {
    async fn deliver(&self, text: &str, window: Option<&WindowId>) -> Result<()> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .push((text.to_string(), window.cloned()));

        if self.fail {
            return Err(MurmurError::Output("mock delivery failure".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
