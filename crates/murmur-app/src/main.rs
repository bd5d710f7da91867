//! Murmur application binary - composition root.
//!
//! Ties the Murmur crates together into one daemon:
//! 1. Load configuration (file, then env, then CLI overrides)
//! 2. Load the Whisper model
//! 3. Discover keyboard devices (fatal if none are accessible)
//! 4. Start the key-event loop driving the dictation controller
//! 5. Wait for Ctrl-C
//!
//! Exit codes: 0 on Ctrl-C shutdown, non-zero when a startup precondition
//! fails (no keyboard device, model load failure).

use std::sync::Arc;

use clap::Parser;

use murmur_audio::{AudioCapture, CaptureConfig, CpalCapture};
use murmur_core::{MurmurConfig, MurmurError};
use murmur_dictation::{DictationController, FocusProbe, OutputSink, X11Desktop};
use murmur_whisper::{Transcriber, WhisperConfig, WhisperService};

mod cli;

use cli::CliArgs;

/// Discover keyboards and start the key-event loop as a background task.
#[cfg(target_os = "linux")]
fn start_key_listener<C, T, F, S>(
    controller: Arc<DictationController<C, T, F, S>>,
) -> Result<(), MurmurError>
where
    C: AudioCapture + 'static,
    T: Transcriber + 'static,
    F: FocusProbe + 'static,
    S: OutputSink + 'static,
{
    use murmur_dictation::{keyboard, ChordDetector};

    let keyboards = keyboard::find_keyboards();
    if keyboards.is_empty() {
        tracing::error!("No keyboards found. Are you in the 'input' group?");
        tracing::error!("  Run: sudo usermod -aG input $USER");
        tracing::error!("  Then log out and log back in.");
        return Err(MurmurError::Input("no keyboard devices found".into()));
    }

    tokio::spawn(keyboard::run(
        keyboards,
        ChordDetector::default(),
        controller,
    ));
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn start_key_listener<C, T, F, S>(
    _controller: Arc<DictationController<C, T, F, S>>,
) -> Result<(), MurmurError>
where
    C: AudioCapture + 'static,
    T: Transcriber + 'static,
    F: FocusProbe + 'static,
    S: OutputSink + 'static,
{
    tracing::error!("Murmur's key-event source requires Linux evdev");
    Err(MurmurError::Input(
        "keyboard capture is only available on Linux".into(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config: file < env < CLI.
    let config_file = args.resolve_config_path();
    let config = MurmurConfig::load_or_default(&config_file).overlaid_with_process_env();
    let config = args.overlay(config);

    // Tracing. RUST_LOG wins over the configured log level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.general.log_level.clone())
            }),
        )
        .init();

    tracing::info!("Starting Murmur v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Transcriber: the model is loaded once at startup.
    let whisper_config = WhisperConfig {
        model: config.whisper.model.clone(),
        model_dir: config.whisper.model_dir.clone(),
        device: config.whisper.device.clone(),
        compute: config.whisper.compute.clone(),
    };
    let model_path = whisper_config.model_path();
    let transcriber = match WhisperService::new(whisper_config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load the Whisper model");
            tracing::error!(
                "Place a GGML model at {} or point MURMUR_MODEL_DIR elsewhere",
                model_path.display()
            );
            return Err(e.into());
        }
    };

    let language = if config.whisper.language.is_empty() {
        None
    } else {
        Some(config.whisper.language.clone())
    };

    let controller = Arc::new(DictationController::new(
        Arc::new(CpalCapture::new(CaptureConfig::default())),
        transcriber,
        X11Desktop::new(),
        Arc::new(X11Desktop::new()),
        language,
    ));

    start_key_listener(Arc::clone(&controller))?;

    tracing::info!(
        model = %config.whisper.model,
        device = %config.whisper.device,
        "Murmur ready"
    );
    tracing::info!("Hold Ctrl+Alt to record, release to transcribe & paste. Ctrl-C to quit.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
