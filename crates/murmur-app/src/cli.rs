//! CLI argument definitions for the Murmur daemon.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use murmur_core::MurmurConfig;

/// Murmur — push-to-talk dictation: hold Ctrl+Alt, speak, release to paste.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Whisper model size (tiny, base, small, medium, large-v3).
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Language hint for transcription. Empty string means auto-detect.
    #[arg(short = 'l', long = "language")]
    pub language: Option<String>,

    /// Compute device (cuda, cpu).
    #[arg(long = "device")]
    pub device: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MURMUR_CONFIG env var > ~/.murmur/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MURMUR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply CLI overrides on top of a loaded configuration.
    pub fn overlay(&self, mut config: MurmurConfig) -> MurmurConfig {
        if let Some(ref model) = self.model {
            config.whisper.model = model.clone();
        }
        if let Some(ref language) = self.language {
            config.whisper.language = language.clone();
        }
        if let Some(ref device) = self.device {
            config.whisper.device = device.clone();
        }
        if let Some(ref log_level) = self.log_level {
            config.general.log_level = log_level.clone();
        }
        config
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".murmur").join("config.toml");
    }
    PathBuf::from("config.toml")
}
