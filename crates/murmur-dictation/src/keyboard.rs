//! Keyboard discovery and the key-event loop (Linux evdev).
//!
//! Reads raw key events at the kernel level, so the chord works no matter
//! which window has focus. Every keyboard-class device feeds decoded
//! `(code, pressed)` events into one channel; a single consumer task owns
//! the chord detector and drives the controller, so transitions are handled
//! strictly in arrival order and the held-set is only ever touched from one
//! place.

use std::sync::Arc;

use evdev::{Device, InputEventKind, Key};
use tokio::sync::mpsc;
use tracing::{info, warn};

use murmur_audio::AudioCapture;
use murmur_whisper::Transcriber;

use crate::chord::ChordDetector;
use crate::controller::DictationController;
use crate::output::{FocusProbe, OutputSink};

/// A decoded key event: evdev code plus press (true) / release (false).
type KeyEvent = (u16, bool);

/// Find input devices that look like real keyboards.
///
/// A device qualifies if it exposes the conventional alphanumeric range
/// (KEY_A through KEY_Z); that filters out lid switches, media remotes and
/// other key-capable devices that cannot type.
pub fn find_keyboards() -> Vec<Device> {
    let mut keyboards = Vec::new();
    for (path, device) in evdev::enumerate() {
        let has_alpha = device
            .supported_keys()
            .map(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_Z))
            .unwrap_or(false);
        if has_alpha {
            info!(
                name = device.name().unwrap_or("unknown"),
                path = %path.display(),
                "Found keyboard"
            );
            keyboards.push(device);
        }
    }
    keyboards
}

/// Run the key-event loop until every device is gone.
///
/// Read errors end only the affected device's reader; the loop itself exits
/// once all readers have stopped.
pub async fn run<C, T, F, S>(
    devices: Vec<Device>,
    mut detector: ChordDetector,
    controller: Arc<DictationController<C, T, F, S>>,
) where
    C: AudioCapture + 'static,
    T: Transcriber + 'static,
    F: FocusProbe + 'static,
    S: OutputSink + 'static,
{
    let (tx, mut rx) = mpsc::channel::<KeyEvent>(256);

    for device in devices {
        let tx = tx.clone();
        let name = device.name().unwrap_or("unknown").to_string();
        tokio::spawn(async move {
            let mut stream = match device.into_event_stream() {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(device = %name, error = %e, "Failed to open event stream");
                    return;
                }
            };

            loop {
                let event = match stream.next_event().await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(device = %name, error = %e, "Keyboard read failed");
                        return;
                    }
                };

                if let InputEventKind::Key(key) = event.kind() {
                    // value: 1 = press, 0 = release, 2 = auto-repeat.
                    let pressed = match event.value() {
                        1 => true,
                        0 => false,
                        _ => continue,
                    };
                    if tx.send((key.code(), pressed)).await.is_err() {
                        return;
                    }
                }
            }
        });
    }
    drop(tx);

    while let Some((code, pressed)) = rx.recv().await {
        if let Some(transition) = detector.on_key_event(code, pressed) {
            controller.on_transition(transition).await;
        }
    }

    warn!("All keyboard devices gone; key-event loop stopped");
}
