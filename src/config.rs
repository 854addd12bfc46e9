use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, FactoryError};

/// Environment variable holding the generative AI key
pub const API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";

// Default values for fields added after the first config format
fn default_placeholder_on_failure() -> bool {
    true
}

fn default_tts_shell() -> String {
    "bash".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub script: ScriptConfig,
    pub visuals: VisualsConfig,
    pub voiceover: VoiceoverConfig,
    pub media: MediaConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, only ever taken from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Base URL of the Generative Language REST API
    pub endpoint: String,
    /// Model used to segment text into scenes
    pub text_model: String,
    /// Model used to render scene images
    pub image_model: String,
    /// Aspect ratio requested from the image model
    pub aspect_ratio: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Sampling temperature for scene segmentation
    pub temperature: f32,
    /// Upper bound on the model's response length
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualsConfig {
    /// Pause between consecutive image requests (seconds)
    pub delay_secs: f64,
    /// Render a placeholder image when generation fails
    #[serde(default = "default_placeholder_on_failure")]
    pub placeholder_on_failure: bool,
    /// Font for placeholder text; common system fonts are tried when unset
    pub placeholder_font: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceoverConfig {
    /// TTS helper script, invoked as `<shell> <helper> <text> <output> <model> <voice>`
    pub helper_path: String,
    /// Interpreter used to run the helper
    #[serde(default = "default_tts_shell")]
    pub shell: String,
    /// Speech model identifier passed to the helper
    pub model: String,
    pub default_voice: String,
    pub default_language: String,
    /// Name of the combined narration file
    pub audio_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    /// Additional encoding options appended before the output path
    /// Common options: ["-preset", "medium", "-crf", "23", "-movflags", "+faststart"]
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives one timestamped folder per run
    pub root_dir: PathBuf,
    /// Characters of the prompt used in the run folder name
    pub slug_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: None,
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                text_model: "gemini-2.5-flash".to_string(),
                image_model: "imagen-3.0-generate-002".to_string(),
                aspect_ratio: "16:9".to_string(),
                timeout_secs: 300,
            },
            script: ScriptConfig {
                temperature: 0.7,
                max_output_tokens: 4000,
            },
            visuals: VisualsConfig {
                delay_secs: 2.0,
                placeholder_on_failure: true,
                placeholder_font: None,
                width: 1920,
                height: 1080,
            },
            voiceover: VoiceoverConfig {
                helper_path: "~/clawd/scripts/gemini-tts.sh".to_string(),
                shell: "bash".to_string(),
                model: "gemini-2.5-flash-preview-tts".to_string(),
                default_voice: "Fenrir".to_string(),
                default_language: "ru".to_string(),
                audio_file_name: "voiceover.wav".to_string(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                width: 1920,
                height: 1080,
                fps: 30,
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                encode_options: vec![
                    "-preset".to_string(), "medium".to_string(),
                ],
            },
            output: OutputConfig {
                root_dir: PathBuf::from("output"),
                slug_length: 30,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FactoryError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FactoryError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FactoryError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| FactoryError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Pull the API key from the process environment (`.env` included)
    pub fn with_env_overrides(mut self) -> Self {
        dotenvy::dotenv().ok();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.gemini.api_key = Some(key);
            }
        }
        self
    }

    pub fn visual_delay(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.visuals.delay_secs.max(0.0)).unwrap_or_default()
    }
}

impl GeminiConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| FactoryError::Config(format!("{} not found in environment", API_KEY_ENV)))
    }
}

impl VoiceoverConfig {
    /// Voice given on the command line, else the configured default
    pub fn resolve_voice(&self, voice: Option<String>) -> String {
        voice.unwrap_or_else(|| self.default_voice.clone())
    }

    /// Language given on the command line, else the configured default
    pub fn resolve_language(&self, language: Option<&str>) -> String {
        language.map(str::to_string).unwrap_or_else(|| self.default_language.clone())
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_toml_round_trip_drops_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.gemini.api_key = Some("secret".to_string());
        config.media.fps = 24;
        config.save_to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("secret"));

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.media.fps, 24);
        assert!(loaded.gemini.api_key.is_none());
        assert!(loaded.visuals.placeholder_on_failure);
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let config = Config::default();
        match config.gemini.require_api_key() {
            Err(FactoryError::Config(msg)) => assert!(msg.contains(API_KEY_ENV)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/usr/bin/tts"), PathBuf::from("/usr/bin/tts"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/clawd/x.sh"), home.join("clawd/x.sh"));
        }
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[media\nfps = 'thirty'").unwrap();

        assert!(matches!(Config::from_file(&path), Err(FactoryError::Config(_))));
    }

    #[test]
    fn test_voice_and_language_fall_back_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.voiceover.default_voice = "Kore".to_string();
        config.voiceover.default_language = "en".to_string();
        config.save_to_file(&path).unwrap();

        let voiceover = Config::from_file(&path).unwrap().voiceover;
        assert_eq!(voiceover.resolve_voice(None), "Kore");
        assert_eq!(voiceover.resolve_language(None), "en");
        assert_eq!(voiceover.resolve_voice(Some("Puck".to_string())), "Puck");
        assert_eq!(voiceover.resolve_language(Some("ru")), "ru");
    }

    #[test]
    fn test_visual_delay_clamps_negative() {
        let mut config = Config::default();
        config.visuals.delay_secs = -1.0;
        assert_eq!(config.visual_delay(), std::time::Duration::ZERO);
    }
}
