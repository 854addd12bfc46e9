use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{VoiceoverConfig, expand_home};
use crate::error::{Result, FactoryError};
use super::SpeechSynthesizer;

/// Speech synthesis through an external TTS helper script.
///
/// The helper is called as `<shell> <helper> <text> <output> <model> <voice>`
/// with `NO_PLAY=1` so it does not play the result back.
pub struct HelperScriptSynthesizer {
    shell: String,
    helper_path: PathBuf,
    model: String,
}

impl HelperScriptSynthesizer {
    pub fn new(config: &VoiceoverConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            helper_path: expand_home(&config.helper_path),
            model: config.model.clone(),
        }
    }

    pub fn check_availability(&self) -> Result<()> {
        if self.helper_path.exists() {
            Ok(())
        } else {
            Err(FactoryError::Config(format!(
                "TTS script not found: {}",
                self.helper_path.display()
            )))
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HelperScriptSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, lang: &str, output_path: &Path) -> Result<()> {
        self.check_availability()?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Running TTS: {} {} ({} chars, model {}, voice {}, lang {})",
              self.shell, self.helper_path.display(), text.chars().count(), self.model, voice, lang);

        let mut cmd = Command::new(&self.shell);
        cmd.arg(&self.helper_path)
            .arg(text)
            .arg(output_path)
            .arg(&self.model)
            .arg(voice)
            .env("NO_PLAY", "1")
            .kill_on_drop(true);

        debug!("Executing TTS command: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| FactoryError::Synthesis {
            message: format!("Failed to execute TTS helper: {}", e),
            stdout: String::new(),
            stderr: String::new(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(FactoryError::Synthesis {
                message: format!("TTS helper exited with {}", output.status),
                stdout,
                stderr,
            });
        }

        debug!("TTS stdout: {}", stdout.trim());
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;

    fn synthesizer_for(script: &str, dir: &Path) -> HelperScriptSynthesizer {
        let helper = dir.join("tts.sh");
        std::fs::write(&helper, script).unwrap();

        let mut config = Config::default().voiceover;
        config.shell = "sh".to_string();
        config.helper_path = helper.display().to_string();
        config.model = "test-model".to_string();
        HelperScriptSynthesizer::new(&config)
    }

    #[tokio::test]
    async fn test_helper_receives_arguments_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = synthesizer_for(
            "printf '%s|%s|%s|%s' \"$1\" \"$3\" \"$4\" \"$NO_PLAY\" > \"$2\"\n",
            dir.path(),
        );

        let output = dir.path().join("audio/voiceover.wav");
        synthesizer.synthesize("Привет мир", "Kore", "ru", &output).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "Привет мир|test-model|Kore|1");
    }

    #[tokio::test]
    async fn test_helper_failure_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = synthesizer_for("echo starting\necho 'bad voice' >&2\nexit 3\n", dir.path());

        let result = synthesizer
            .synthesize("text", "Nobody", "en", &dir.path().join("out.wav"))
            .await;

        match result {
            Err(FactoryError::Synthesis { stdout, stderr, .. }) => {
                assert_eq!(stdout.trim(), "starting");
                assert_eq!(stderr.trim(), "bad voice");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_synthesis_stops_the_helper() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = synthesizer_for("sleep 1\ntouch \"$2\"\n", dir.path());
        let output = dir.path().join("voiceover.wav");

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            synthesizer.synthesize("text", "Fenrir", "ru", &output),
        )
        .await;
        assert!(result.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_helper_is_configuration_error() {
        let mut config = Config::default().voiceover;
        config.helper_path = "/nonexistent/tts-helper.sh".to_string();
        let synthesizer = HelperScriptSynthesizer::new(&config);

        assert!(matches!(synthesizer.check_availability(), Err(FactoryError::Config(_))));
        let result = synthesizer
            .synthesize("text", "Fenrir", "ru", Path::new("/tmp/never.wav"))
            .await;
        assert!(matches!(result, Err(FactoryError::Config(_))));
    }
}
