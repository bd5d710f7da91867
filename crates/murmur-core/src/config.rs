use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Murmur daemon.
///
/// Loaded from `~/.murmur/config.toml` by default; every key can also be
/// supplied through the environment (see [`MurmurConfig::overlaid_with_env`]),
/// and environment values win over the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MurmurConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub whisper: WhisperSettings,
}

impl Default for MurmurConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            whisper: WhisperSettings::default(),
        }
    }
}

impl MurmurConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MurmurConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay the configuration with values from the process environment.
    pub fn overlaid_with_process_env(self) -> Self {
        self.overlaid_with_env(|key| std::env::var(key).ok())
    }

    /// Overlay the configuration with values from an environment lookup.
    ///
    /// A present key replaces the corresponding config field; absent keys
    /// leave the file/default value in place. Taking the lookup as a closure
    /// keeps this testable without mutating the process environment.
    pub fn overlaid_with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = env("MURMUR_MODEL") {
            self.whisper.model = v;
        }
        if let Some(v) = env("MURMUR_LANG") {
            self.whisper.language = v;
        }
        if let Some(v) = env("MURMUR_DEVICE") {
            self.whisper.device = v;
        }
        if let Some(v) = env("MURMUR_COMPUTE") {
            self.whisper.compute = v;
        }
        if let Some(v) = env("MURMUR_MODEL_DIR") {
            self.whisper.model_dir = v;
        }
        self
    }
}

/// General daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Speech-to-text engine settings.
///
/// These are passed through to the transcription backend and validated
/// there, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperSettings {
    /// Model size: "tiny", "base", "small", "medium", "large-v3".
    pub model: String,
    /// Language hint for transcription. Empty string means auto-detect.
    pub language: String,
    /// Compute device: "cuda" or "cpu".
    pub device: String,
    /// Numeric precision mode, e.g. "float16", "int8".
    pub compute: String,
    /// Directory holding GGML model files (`ggml-<size>.bin`).
    pub model_dir: String,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: "en".to_string(),
            device: "cuda".to_string(),
            compute: "float16".to_string(),
            model_dir: "~/.murmur/models".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = MurmurConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.whisper.model, "base");
        assert_eq!(config.whisper.language, "en");
        assert_eq!(config.whisper.device, "cuda");
        assert_eq!(config.whisper.compute, "float16");
        assert_eq!(config.whisper.model_dir, "~/.murmur/models");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[whisper]
model = "small"
language = ""
device = "cpu"
"#;
        let file = create_temp_config(content);
        let config = MurmurConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.whisper.model, "small");
        assert_eq!(config.whisper.language, "");
        assert_eq!(config.whisper.device, "cpu");
        // Unspecified keys fall back to defaults.
        assert_eq!(config.whisper.compute, "float16");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[whisper]
model = "tiny"
"#;
        let file = create_temp_config(content);
        let config = MurmurConfig::load(file.path()).unwrap();
        assert_eq!(config.whisper.model, "tiny");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.whisper.device, "cuda");
    }

    #[test]
    fn test_load_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = MurmurConfig::load(file.path()).unwrap();
        assert_eq!(config.whisper.model, "base");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = MurmurConfig::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MurmurConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.whisper.model, "base");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = MurmurConfig::default();
        config.whisper.model = "large-v3".to_string();
        config.save(&path).unwrap();

        let reloaded = MurmurConfig::load(&path).unwrap();
        assert_eq!(reloaded.whisper.model, "large-v3");
        assert_eq!(reloaded.general.log_level, config.general.log_level);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let config = MurmurConfig::default();
        config.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_env_overlay_replaces_values() {
        let config = MurmurConfig::default().overlaid_with_env(|key| match key {
            "MURMUR_MODEL" => Some("medium".to_string()),
            "MURMUR_LANG" => Some("de".to_string()),
            "MURMUR_DEVICE" => Some("cpu".to_string()),
            _ => None,
        });

        assert_eq!(config.whisper.model, "medium");
        assert_eq!(config.whisper.language, "de");
        assert_eq!(config.whisper.device, "cpu");
        // Keys absent from the environment keep their prior value.
        assert_eq!(config.whisper.compute, "float16");
        assert_eq!(config.whisper.model_dir, "~/.murmur/models");
    }

    #[test]
    fn test_env_overlay_empty_env_is_identity() {
        let config = MurmurConfig::default().overlaid_with_env(|_| None);
        assert_eq!(config.whisper.model, "base");
        assert_eq!(config.whisper.language, "en");
    }

    #[test]
    fn test_env_overlay_wins_over_file() {
        let content = r#"
[whisper]
model = "small"
language = "fr"
"#;
        let file = create_temp_config(content);
        let config = MurmurConfig::load(file.path())
            .unwrap()
            .overlaid_with_env(|key| match key {
                "MURMUR_MODEL" => Some("tiny".to_string()),
                _ => None,
            });

        assert_eq!(config.whisper.model, "tiny");
        assert_eq!(config.whisper.language, "fr");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = MurmurConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: MurmurConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.whisper.model, config.whisper.model);
        assert_eq!(deserialized.general.log_level, config.general.log_level);
    }
}
