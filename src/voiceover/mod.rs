// Voiceover generation
//
// All scene narration is synthesized as one audio file. Scene timing comes
// from the declared durations alone; it is never measured against the audio,
// so the two can drift apart.

pub mod helper;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub use helper::*;
use crate::error::{Result, FactoryError};
use crate::scene::{Scene, TimingRecord, build_timing_table, save_timing, total_duration};

pub const TIMING_FILE_NAME: &str = "timing.json";

/// Text-to-speech capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with the given voice and language into `output_path`
    async fn synthesize(&self, text: &str, voice: &str, lang: &str, output_path: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct VoiceoverResult {
    pub audio_path: PathBuf,
    pub timing_path: PathBuf,
    pub timing: Vec<TimingRecord>,
    /// Sum of declared scene durations
    pub total_duration: f64,
}

/// Narration text for the whole video
pub fn combine_narration(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct VoiceoverGenerator<'a> {
    synthesizer: &'a dyn SpeechSynthesizer,
    audio_file_name: String,
}

impl<'a> VoiceoverGenerator<'a> {
    pub fn new<S: Into<String>>(synthesizer: &'a dyn SpeechSynthesizer, audio_file_name: S) -> Self {
        Self {
            synthesizer,
            audio_file_name: audio_file_name.into(),
        }
    }

    pub async fn generate_voiceover(
        &self,
        scenes: &[Scene],
        output_dir: &Path,
        voice: &str,
        lang: &str,
    ) -> Result<VoiceoverResult> {
        if scenes.is_empty() {
            return Err(FactoryError::NoContent("no scenes to narrate".to_string()));
        }

        let narration = combine_narration(scenes);
        info!("Generating voiceover: voice {} ({}), {} scenes, {} chars",
              voice, lang, scenes.len(), narration.chars().count());

        fs::create_dir_all(output_dir).await?;
        let audio_path = output_dir.join(&self.audio_file_name);

        self.synthesizer.synthesize(&narration, voice, lang, &audio_path).await?;

        if !audio_path.exists() {
            return Err(FactoryError::OutputMissing(audio_path.display().to_string()));
        }
        info!("Voiceover generated: {}", audio_path.display());

        let timing = build_timing_table(scenes);
        let timing_path = output_dir.join(TIMING_FILE_NAME);
        save_timing(&timing, &timing_path).await?;

        Ok(VoiceoverResult {
            audio_path,
            timing_path,
            timing,
            total_duration: total_duration(scenes),
        })
    }
}
